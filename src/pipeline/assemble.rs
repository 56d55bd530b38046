//! Output assembly: JPEG page images → a single PDF via lopdf.
//!
//! Every input page becomes one output page of the configured physical
//! size carrying a single full-bleed image XObject. The JPEG bytes are
//! embedded as a `DCTDecode` stream untouched — no transcoding, the PDF
//! viewer decodes the JPEG directly.

use crate::error::PdfInkError;
use crate::pipeline::render::PageSizePt;
use lopdf::{Dictionary, Document, Object, Stream};

/// One encoded page ready for embedding.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub jpeg: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

/// Build the output PDF. `pages` must already be in output order.
pub fn assemble_pdf(pages: &[PageImage], page_size: PageSizePt) -> Result<Vec<u8>, PdfInkError> {
    if pages.is_empty() {
        return Err(PdfInkError::AssemblyFailed("no pages to assemble".into()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

    for (index, page) in pages.iter().enumerate() {
        let image_id = doc.add_object(image_xobject(page));

        // Stretch the image unit square to the full page box.
        let content = format!(
            "q\n{:.2} 0 0 {:.2} 0 0 cm\n/Im{} Do\nQ",
            page_size.width_pt, page_size.height_pt, index
        );
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut xobjects = Dictionary::new();
        xobjects.set(format!("Im{}", index), Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_size.width_pt),
                Object::Real(page_size.height_pt),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));

        kids.push(Object::Reference(doc.add_object(page_dict)));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(pages.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));
    doc.objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| PdfInkError::AssemblyFailed(e.to_string()))?;
    Ok(bytes)
}

fn image_xobject(page: &PageImage) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(page.width_px as i64));
    dict.set("Height", Object::Integer(page.height_px as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    // The stream carries compressed JPEG data already; deflating it again
    // would only waste space.
    Stream::new(dict, page.jpeg.clone()).with_compression(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::encode_jpeg;
    use image::{Rgba, RgbaImage};

    const A4: PageSizePt = PageSizePt {
        width_pt: 595.276,
        height_pt: 841.89,
    };

    fn jpeg_page(shade: u8) -> PageImage {
        let img = RgbaImage::from_pixel(32, 48, Rgba([shade, shade, shade, 255]));
        PageImage {
            jpeg: encode_jpeg(&img, 85).unwrap(),
            width_px: 32,
            height_px: 48,
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = assemble_pdf(&[], A4).expect_err("no pages must fail");
        assert!(matches!(err, PdfInkError::AssemblyFailed(_)));
    }

    #[test]
    fn two_pages_in_order() {
        let bytes = assemble_pdf(&[jpeg_page(10), jpeg_page(200)], A4).expect("assemble");
        assert!(bytes.starts_with(b"%PDF"));

        let doc = Document::load_mem(&bytes).expect("output must parse");
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);

        // Page order follows input order: page 1 embeds Im0, page 2 embeds Im1.
        let first = doc.get_dictionary(pages[&1]).expect("page 1 dict");
        let resources = first
            .get(b"Resources")
            .and_then(|o| o.as_dict())
            .expect("resources");
        let xobjects = resources
            .get(b"XObject")
            .and_then(|o| o.as_dict())
            .expect("xobject dict");
        assert!(xobjects.get(b"Im0").is_ok());
    }

    #[test]
    fn media_box_is_a4() {
        let bytes = assemble_pdf(&[jpeg_page(128)], A4).expect("assemble");
        let doc = Document::load_mem(&bytes).expect("parse");
        let pages = doc.get_pages();
        let page = doc.get_dictionary(pages[&1]).expect("page dict");
        let media_box = page
            .get(b"MediaBox")
            .and_then(|o| o.as_array())
            .expect("media box");
        let width = media_box[2].as_float().expect("width");
        assert!((width - 595.276).abs() < 0.01, "got {width}");
    }

    #[test]
    fn image_stream_keeps_jpeg_bytes() {
        let page = jpeg_page(77);
        let stream = image_xobject(&page);
        assert_eq!(stream.content, page.jpeg);
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
    }
}
