use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::features::placement::Placement;

pub const SIGNATURE_SCALE: f64 = 0.25;
pub const ATTESTATION_GAP: f64 = 15.0;
pub const ATTESTATION_FONT_SIZE: f64 = 10.0;
const FALLBACK_PAGE_SIZE: (f64, f64) = (595.0, 842.0);
const UNKNOWN_SIGNER: &str = "Unknown";

/// The text line drawn under the signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Attestation {
    pub signer: String,
    pub timestamp: String,
}

impl Attestation {
    pub fn new(signer: Option<&str>, at: NaiveDateTime) -> Self {
        let signer = signer
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SIGNER)
            .to_string();
        Self {
            signer,
            timestamp: format_timestamp(at),
        }
    }

    pub fn line(&self) -> String {
        format!("Signed by {} on {}", self.signer, self.timestamp)
    }
}

/// `M/D/YYYY, h:mm:ss AM`, the en-US `toLocaleString` shape.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Where the image lands, in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The placement is measured from the visual top; PDF y grows upwards.
pub fn signature_rect(page_height: f64, placement: Placement, img_w: u32, img_h: u32) -> SignatureRect {
    let width = img_w as f64 * SIGNATURE_SCALE;
    let height = img_h as f64 * SIGNATURE_SCALE;
    SignatureRect {
        x: placement.x,
        y: page_height - placement.y - height,
        width,
        height,
    }
}

pub fn signed_file_name(epoch_millis: i64) -> String {
    format!("signed_{epoch_millis}.pdf")
}

/// Stamps the signature and attestation onto the first page and returns the
/// serialized document.
pub fn compose_signed_pdf(
    pdf_bytes: &[u8],
    signature_bytes: &[u8],
    placement: Placement,
    attestation: &Attestation,
) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(pdf_bytes).map_err(|e| Error::PdfParse(e.to_string()))?;
    let page_id = doc
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| Error::PdfParse("no_pages".into()))?;
    let (_, page_height) = page_dimensions(&doc, page_id)?;

    let img = image::load_from_memory(signature_bytes)?.to_rgba8();
    let (img_w, img_h) = img.dimensions();
    let mut rgb = Vec::with_capacity((img_w * img_h * 3) as usize);
    let mut alpha = Vec::with_capacity((img_w * img_h) as usize);
    for pixel in img.pixels() {
        rgb.push(pixel[0]);
        rgb.push(pixel[1]);
        rgb.push(pixel[2]);
        alpha.push(pixel[3]);
    }

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    ));
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    ));
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    // Shared or inherited resources are copied onto the page before editing.
    let mut resources = page_resources(&doc, page_id);
    let image_name = insert_resource(&doc, &mut resources, b"XObject", "ImSig", image_id)?;
    let font_name = insert_resource(&doc, &mut resources, b"Font", "FSig", font_id)?;
    doc.get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| Error::PdfParse("page_missing_dict".into()))?
        .set("Resources", Object::Dictionary(resources));

    // Existing content runs inside its own q/Q so a leftover CTM or an
    // unterminated final operator cannot reach our drawing.
    let isolated = isolate_page_contents(&mut doc, page_id)?;
    let rect = signature_rect(page_height, placement, img_w, img_h);
    let content = format!(
        "{}q {} 0 0 {} {} {} cm /{} Do Q\nBT /{} {} Tf 0 0 0 rg {} {} Td ({}) Tj ET\n",
        if isolated { "\nQ\n" } else { "" },
        rect.width,
        rect.height,
        rect.x,
        rect.y,
        image_name,
        font_name,
        ATTESTATION_FONT_SIZE,
        rect.x,
        rect.y - ATTESTATION_GAP,
        escape_pdf_text(&attestation.line()),
    );
    doc.add_page_contents(page_id, content.into_bytes())
        .map_err(|e| Error::PdfSave(format!("add_content_failed:{e}")))?;

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| Error::PdfSave(e.to_string()))?;
    Ok(out)
}

/// Writes `bytes` to `dir/name` through a temp file so a failed write never
/// leaves a partial download behind.
pub fn write_download(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, bytes)?;
    let path = dir.join(name);
    tmp.persist(&path)
        .map_err(|e| Error::PdfSave(format!("persist_failed:{e}")))?;
    Ok(path)
}

/// Puts a `q` stream in front of the page's content streams. Returns false
/// when the page has no content to wrap.
fn isolate_page_contents(doc: &mut Document, page_id: ObjectId) -> Result<bool> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|_| Error::PdfParse("page_missing_dict".into()))?;
    let mut streams: Vec<Object> = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        _ => Vec::new(),
    };
    if streams.is_empty() {
        return Ok(false);
    }
    let push_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    streams.insert(0, Object::Reference(push_id));
    doc.get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| Error::PdfParse("page_missing_dict".into()))?
        .set("Contents", streams);
    Ok(true)
}

fn page_dimensions(doc: &Document, page_id: ObjectId) -> Result<(f64, f64)> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|_| Error::PdfParse("page_missing_dict".into()))?;
        if let Some((w, h)) = extract_media_box(doc, dict) {
            return Ok((w, h));
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Ok(FALLBACK_PAGE_SIZE)
}

fn extract_media_box(doc: &Document, dict: &Dictionary) -> Option<(f64, f64)> {
    let arr = resolve(doc, dict.get(b"MediaBox").ok()?)?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = obj_to_f64(&arr[0])?;
    let lly = obj_to_f64(&arr[1])?;
    let urx = obj_to_f64(&arr[2])?;
    let ury = obj_to_f64(&arr[3])?;
    Some((urx - llx, ury - lly))
}

fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// The page's effective resource dictionary, walking up the page tree.
fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_object(id).and_then(|o| o.as_dict()) else {
            break;
        };
        if let Some(res) = dict
            .get(b"Resources")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        {
            return res.clone();
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Dictionary::new()
}

/// Adds `id` under a free name in the `category` sub-dictionary and returns
/// the name used.
fn insert_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    base: &str,
    id: ObjectId,
) -> Result<String> {
    let mut sub = match resources.get(category) {
        Ok(obj) => resolve(doc, obj)
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .ok_or_else(|| Error::PdfParse("resources_invalid".into()))?,
        Err(_) => Dictionary::new(),
    };
    let mut name = base.to_string();
    let mut n = 1;
    while sub.has(name.as_bytes()) {
        name = format!("{base}{n}");
        n += 1;
    }
    sub.set(name.clone(), id);
    resources.set(category.to_vec(), Object::Dictionary(sub));
    Ok(name)
}

/// Literal-string body for a WinAnsi font. Characters outside Latin-1 become `?`.
fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c if (c as u32) < 0x20 => out.push(' '),
            c if (c as u32) < 0x80 => out.push(c),
            c if (c as u32) <= 0xFF => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::{dictionary, Document, Object, Stream};

    pub fn two_page_pdf(height: i64) -> Vec<u8> {
        pdf_with_pages(
            height,
            &["BT /F1 12 Tf 72 720 Td (one) Tj ET", "BT /F1 12 Tf 72 720 Td (two) Tj ET"],
        )
    }

    /// Letter-width pages of the given height, one per content body. MediaBox
    /// lives on the Pages node so every page inherits it.
    pub fn pdf_with_pages(height: i64, bodies: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut kids = Vec::new();
        for body in bodies {
            let content_id = doc.add_object(Stream::new(dictionary! {}, body.as_bytes().to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), height.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::signature::SignatureCanvas;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(15, 4, 5)
            .unwrap()
    }

    fn page_content(bytes: &[u8], page: u32) -> String {
        let doc = Document::load_mem(bytes).unwrap();
        let id = doc.get_pages()[&page];
        String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned()
    }

    #[test]
    fn vertical_offset_is_flipped_from_top() {
        let rect = signature_rect(792.0, Placement::new(40.0, 40.0), 400, 150);
        assert_eq!(rect.height, 37.5);
        assert_eq!(rect.width, 100.0);
        assert_eq!(rect.y, 714.5);
        assert_eq!(rect.x, 40.0);
    }

    #[test]
    fn timestamp_matches_locale_shape() {
        assert_eq!(format_timestamp(at()), "1/2/2025, 3:04:05 PM");
        let line = Attestation::new(Some("  "), at()).line();
        assert_eq!(line, "Signed by Unknown on 1/2/2025, 3:04:05 PM");
    }

    #[test]
    fn signature_and_attestation_land_on_first_page_only() {
        let pdf = fixtures::two_page_pdf(792);
        let sig = SignatureCanvas::default().to_png().unwrap();
        let attestation = Attestation::new(Some("Ada"), at());

        let out = compose_signed_pdf(&pdf, &sig, Placement::default(), &attestation).unwrap();

        let first = page_content(&out, 1);
        assert!(first.contains("(one) Tj"), "{first}");
        assert!(first.contains("q 100 0 0 37.5 40 714.5 cm /ImSig Do Q"), "{first}");
        assert!(first.contains("/FSig 10 Tf"), "{first}");
        assert!(first.contains("40 699.5 Td (Signed by Ada on 1/2/2025, 3:04:05 PM) Tj"), "{first}");

        let second = page_content(&out, 2);
        assert!(!second.contains("ImSig"));
    }

    #[test]
    fn existing_page_transform_does_not_leak_into_signature() {
        let pdf = fixtures::pdf_with_pages(792, &["2 0 0 2 0 0 cm"]);
        let sig = SignatureCanvas::default().to_png().unwrap();
        let out = compose_signed_pdf(&pdf, &sig, Placement::default(), &Attestation::new(None, at()))
            .unwrap();

        let content = page_content(&out, 1);
        assert!(content.starts_with("q\n2 0 0 2 0 0 cm"), "{content}");
        assert!(
            content.contains("2 0 0 2 0 0 cm\nQ\nq 100 0 0 37.5 40 714.5 cm /ImSig Do Q"),
            "{content}"
        );
        assert!(!content.contains("cmq"), "{content}");

        let doc = Document::load_mem(&out).unwrap();
        let ops = doc
            .get_and_decode_page_content(doc.get_pages()[&1])
            .unwrap()
            .operations;
        let depth = ops.iter().fold(0i32, |depth, op| match op.operator.as_str() {
            "q" => depth + 1,
            "Q" => depth - 1,
            _ => depth,
        });
        assert_eq!(depth, 0);
    }

    #[test]
    fn page_without_content_gets_only_signature() {
        let mut doc = Document::load_mem(&fixtures::pdf_with_pages(792, &["BT ET"])).unwrap();
        let page_id = doc.get_pages()[&1];
        doc.get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .unwrap()
            .remove(b"Contents");
        let mut pdf = Vec::new();
        doc.save_to(&mut pdf).unwrap();

        let sig = SignatureCanvas::default().to_png().unwrap();
        let out = compose_signed_pdf(&pdf, &sig, Placement::default(), &Attestation::new(None, at()))
            .unwrap();
        assert!(page_content(&out, 1).starts_with("q 100 0 0 37.5 40 714.5 cm"));
    }

    #[test]
    fn inherited_resources_are_kept_on_the_page() {
        let pdf = fixtures::two_page_pdf(792);
        let sig = SignatureCanvas::default().to_png().unwrap();
        let out = compose_signed_pdf(&pdf, &sig, Placement::default(), &Attestation::new(None, at()))
            .unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let page_id = doc.get_pages()[&1];
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(b"FSig"));

        let image_id = resources
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"ImSig")
            .unwrap()
            .as_reference()
            .unwrap();
        let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 400);
        assert!(image.dict.has(b"SMask"));
    }

    #[test]
    fn resource_names_do_not_collide() {
        let mut doc = Document::with_version("1.5");
        let taken = doc.add_object(dictionary! {});
        let fresh = doc.add_object(dictionary! {});
        let mut resources = dictionary! { "XObject" => dictionary! { "ImSig" => taken } };
        let name = insert_resource(&doc, &mut resources, b"XObject", "ImSig", fresh).unwrap();
        assert_eq!(name, "ImSig1");
    }

    #[test]
    fn garbage_pdf_is_a_parse_error() {
        let sig = SignatureCanvas::default().to_png().unwrap();
        let err = compose_signed_pdf(b"not a pdf", &sig, Placement::default(), &Attestation::new(None, at()))
            .unwrap_err();
        assert!(matches!(err, Error::PdfParse(_)));
    }

    #[test]
    fn garbage_signature_is_an_image_error() {
        let pdf = fixtures::two_page_pdf(792);
        let err = compose_signed_pdf(&pdf, b"nope", Placement::default(), &Attestation::new(None, at()))
            .unwrap_err();
        assert!(matches!(err, Error::Image(_)));
    }

    #[test]
    fn text_escaping() {
        assert_eq!(escape_pdf_text("a(b)\\c"), "a\\(b\\)\\\\c");
        assert_eq!(escape_pdf_text("Zoë"), "Zo\\353");
        assert_eq!(escape_pdf_text("李"), "?");
    }

    #[test]
    fn download_is_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_download(dir.path(), &signed_file_name(1700000000000), b"%PDF").unwrap();
        assert_eq!(path, dir.path().join("signed_1700000000000.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
