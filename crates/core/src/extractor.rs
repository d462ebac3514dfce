use crate::error::IngestError;
use crate::models::Document;
use lopdf::Document as PdfDocument;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        let document =
            PdfDocument::load_mem(bytes).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = match document.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(error) => {
                    debug!(page = page_no, %error, "page has no extractable text");
                    String::new()
                }
            };
            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(pages)
    }
}

pub fn extract_page_texts(bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
    LopdfExtractor.extract_pages(bytes)
}

pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, IngestError> {
    let pages = extract_page_texts(bytes)?;
    Ok(pages.into_iter().map(|page| page.text).collect())
}

pub fn extract_plain_text(bytes: &[u8]) -> Result<String, IngestError> {
    Ok(String::from_utf8(bytes.to_vec())?)
}

pub fn extract_text(document: &Document) -> Result<String, IngestError> {
    if document.is_pdf() {
        extract_pdf_text(&document.bytes)
    } else {
        extract_plain_text(&document.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    // An empty string produces a page whose content stream draws nothing.
    fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let operations = if line.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("content should encode"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("pdf should serialize");
        bytes
    }

    #[test]
    fn pdf_text_is_extracted_in_page_order() {
        let bytes = pdf_with_pages(&["Alpha", "", "Gamma"]);

        let pages = extract_page_texts(&bytes).expect("pdf should parse");
        let numbers: Vec<u32> = pages.iter().map(|page| page.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(pages[0].text.contains("Alpha"));
        assert_eq!(pages[1].text.trim(), "");
        assert!(pages[2].text.contains("Gamma"));

        let text = extract_text(&Document::pdf(bytes)).expect("blank page should not fail");
        let alpha = text.find("Alpha").expect("first page text");
        let gamma = text.find("Gamma").expect("last page text");
        assert!(alpha < gamma);
    }

    #[test]
    fn single_page_pdf_yields_its_text() {
        let bytes = pdf_with_pages(&["Penalty clause applies"]);
        let text = extract_text(&Document::pdf(bytes)).expect("pdf should parse");
        assert!(text.contains("Penalty"));
    }

    #[test]
    fn malformed_pdf_is_a_parse_error() {
        let result = extract_text(&Document::pdf(b"%PDF-1.4\n%broken".to_vec()));
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
    }

    #[test]
    fn plain_text_is_decoded_as_utf8() {
        let document = Document::new("héllo wörld".as_bytes().to_vec(), "text/plain");
        assert_eq!(extract_text(&document).unwrap(), "héllo wörld");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let document = Document::new(vec![0xff, 0xfe, 0xfd], "text/plain");
        assert!(matches!(
            extract_text(&document),
            Err(IngestError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn media_type_parameters_still_select_pdf() {
        let document = Document::new(Vec::new(), "application/pdf; charset=binary");
        assert!(document.is_pdf());
    }
}
