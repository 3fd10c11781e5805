//! In-memory PDF fixtures for unit tests.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

#[derive(Debug, Clone, Copy)]
pub enum Fixture {
    /// Baseline JPEG behind DCTDecode
    Jpeg { width: u32, height: u32 },
    /// Flate-compressed 8-bit RGB
    Rgb { width: u32, height: u32 },
    /// Uncompressed 8-bit gray with a soft mask
    GrayWithAlpha { width: u32, height: u32 },
    /// Claims FlateDecode but the data is not zlib
    Corrupt { width: u32, height: u32 },
    /// Flate gray whose predictor parameters describe an impossibly wide row
    BadPredictor { width: u32, height: u32 },
}

/// A gradient JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push((x * 255 / width.max(1)) as u8);
            pixels.push((y * 255 / height.max(1)) as u8);
            pixels.push(128);
        }
    }
    let mut out = Vec::new();
    jpeg_encoder::Encoder::new(&mut out, 90)
        .encode(&pixels, width as u16, height as u16, jpeg_encoder::ColorType::Rgb)
        .expect("failed to encode fixture JPEG");
    out
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("failed to compress fixture");
    encoder.finish().expect("failed to compress fixture")
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}

fn add_image(doc: &mut Document, fixture: Fixture) -> ObjectId {
    match fixture {
        Fixture::Jpeg { width, height } => {
            let mut dict = image_dict(width, height, "DeviceRGB");
            dict.set("Filter", "DCTDecode");
            doc.add_object(Stream::new(dict, jpeg_bytes(width, height)))
        }
        Fixture::Rgb { width, height } => {
            let raw = vec![200u8; (width * height * 3) as usize];
            let mut dict = image_dict(width, height, "DeviceRGB");
            dict.set("Filter", "FlateDecode");
            doc.add_object(Stream::new(dict, zlib(&raw)))
        }
        Fixture::GrayWithAlpha { width, height } => {
            let mask_id = doc.add_object(Stream::new(
                image_dict(width, height, "DeviceGray"),
                vec![128u8; (width * height) as usize],
            ));
            let mut dict = image_dict(width, height, "DeviceGray");
            dict.set("SMask", Object::Reference(mask_id));
            doc.add_object(Stream::new(dict, vec![60u8; (width * height) as usize]))
        }
        Fixture::Corrupt { width, height } => {
            let mut dict = image_dict(width, height, "DeviceRGB");
            dict.set("Filter", "FlateDecode");
            doc.add_object(Stream::new(dict, b"definitely not zlib data".to_vec()))
        }
        Fixture::BadPredictor { width, height } => {
            let raw = vec![90u8; (width * height) as usize];
            let mut dict = image_dict(width, height, "DeviceGray");
            dict.set("Filter", "FlateDecode");
            dict.set(
                "DecodeParms",
                dictionary! {
                    "Predictor" => 2,
                    "Colors" => 1i64 << 32,
                    "Columns" => 1i64 << 32,
                },
            );
            doc.add_object(Stream::new(dict, zlib(&raw)))
        }
    }
}

/// A document with one page per entry, each drawing its images in order.
pub fn build_document(pages: &[Vec<Fixture>]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for images in pages {
        let mut xobjects = Dictionary::new();
        let mut content = Vec::new();
        for (i, fixture) in images.iter().enumerate() {
            let image_id = add_image(&mut doc, *fixture);
            let name = format!("Im{}", i);
            content.extend_from_slice(format!("q 100 0 0 100 0 0 cm /{} Do Q\n", name).as_bytes());
            xobjects.set(name, Object::Reference(image_id));
        }
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Same as [`build_document`], serialized.
pub fn build_pdf(pages: &[Vec<Fixture>]) -> Vec<u8> {
    let mut doc = build_document(pages);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}
