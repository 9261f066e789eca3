//! Synthetic PDF documents for tests.
//!
//! Enabled for this crate's unit tests and, through the `fixtures` feature,
//! for the CLI and server test suites.

use lopdf::content::{Content, Operation};
use lopdf::encryption::{decrypt_object, get_encryption_key};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

/// An image XObject to embed in a generated page.
#[derive(Debug, Clone)]
pub struct TestImage {
    dict: Dictionary,
    content: Vec<u8>,
}

impl TestImage {
    /// A JPEG-filtered image whose stream is exactly `size` bytes long.
    ///
    /// The payload is never decoded, so only the JPEG marker is real.
    pub fn jpeg(width: u32, height: u32, size: usize) -> Self {
        let mut content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        if size >= 2 {
            content[0] = 0xFF;
            content[1] = 0xD8;
        }
        Self::new(width, height, "DeviceRGB".into(), 8, Some("DCTDecode"), content)
    }

    /// An uncompressed 8-bit grayscale image.
    pub fn raw_gray(width: u32, height: u32) -> Self {
        let content = vec![0x80; (width * height) as usize];
        Self::new(width, height, "DeviceGray".into(), 8, None, content)
    }

    /// An uncompressed 8-bit RGB image.
    pub fn raw_rgb(width: u32, height: u32) -> Self {
        let content = vec![0x40; (width * height * 3) as usize];
        Self::new(width, height, "DeviceRGB".into(), 8, None, content)
    }

    /// An 8-bit indexed image over an RGB `palette`, one index per pixel.
    pub fn indexed(width: u32, height: u32, palette: Vec<u8>, indices: Vec<u8>) -> Self {
        let hival = (palette.len() / 3).saturating_sub(1) as i64;
        let color_space = Object::Array(vec![
            "Indexed".into(),
            "DeviceRGB".into(),
            hival.into(),
            Object::String(palette, StringFormat::Hexadecimal),
        ]);
        Self::new(width, height, color_space, 8, None, indices)
    }

    /// An uncompressed 1-bit grayscale image of vertical stripes.
    pub fn bilevel(width: u32, height: u32) -> Self {
        let row_bytes = (width as usize).div_ceil(8);
        let content = vec![0b1010_1010; row_bytes * height as usize];
        Self::new(width, height, "DeviceGray".into(), 1, None, content)
    }

    /// A CCITT fax image whose stream is `size` opaque bytes.
    pub fn ccitt(width: u32, height: u32, size: usize) -> Self {
        Self::new(
            width,
            height,
            "DeviceGray".into(),
            1,
            Some("CCITTFaxDecode"),
            vec![0x55; size],
        )
    }

    fn new(
        width: u32,
        height: u32,
        color_space: Object,
        bits: i64,
        filter: Option<&str>,
        content: Vec<u8>,
    ) -> Self {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => color_space,
            "BitsPerComponent" => bits,
        };
        if let Some(filter) = filter {
            dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
        }
        Self { dict, content }
    }
}

#[derive(Debug, Clone)]
struct PageSpec {
    text: String,
    images: Vec<TestImage>,
    wrap_in_form: bool,
}

/// Builder for small multi-page PDFs with text and image XObjects.
#[derive(Debug, Clone, Default)]
pub struct PdfBuilder {
    pages: Vec<PageSpec>,
    inherited_images: Option<Vec<TestImage>>,
    encrypted: bool,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page showing `text` and no images.
    pub fn text_page(self, text: &str) -> Self {
        self.page(text, Vec::new())
    }

    /// A page with no content at all.
    pub fn blank_page(self) -> Self {
        self.page("", Vec::new())
    }

    /// A page showing `text` (may be empty) with the given images in its resources.
    pub fn page(mut self, text: &str, images: Vec<TestImage>) -> Self {
        self.pages.push(PageSpec {
            text: text.to_string(),
            images,
            wrap_in_form: false,
        });
        self
    }

    /// A page whose images sit inside a Form XObject.
    pub fn form_page(mut self, images: Vec<TestImage>) -> Self {
        self.pages.push(PageSpec {
            text: String::new(),
            images,
            wrap_in_form: true,
        });
        self
    }

    /// Put resources on the page tree node instead of the pages.
    ///
    /// Every page then inherits these images and no page keeps its own.
    pub fn inherited_images(mut self, images: Vec<TestImage>) -> Self {
        self.inherited_images = Some(images);
        self
    }

    /// Encrypt the document (RC4, 128-bit) with an empty user password.
    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    /// Serialize the document.
    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for spec in &self.pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(&spec.text)));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            };

            if self.inherited_images.is_none() {
                let mut xobjects = add_images(&mut doc, &spec.images);
                if spec.wrap_in_form {
                    let form_id = doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Form",
                            "BBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                            "Resources" => dictionary! { "XObject" => xobjects },
                        },
                        Vec::new(),
                    ));
                    xobjects = dictionary! { "Fm0" => form_id };
                }
                page.set(
                    "Resources",
                    dictionary! {
                        "Font" => dictionary! { "F1" => font_id },
                        "XObject" => xobjects,
                    },
                );
            }

            kids.push(doc.add_object(page).into());
        }

        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        };
        if let Some(images) = &self.inherited_images {
            let xobjects = add_images(&mut doc, images);
            pages.set(
                "Resources",
                dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => xobjects,
                },
            );
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if self.encrypted {
            encrypt_with_empty_password(&mut doc);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("in-memory PDF write");
        bytes
    }
}

fn page_content(text: &str) -> Vec<u8> {
    let operations = if text.is_empty() {
        Vec::new()
    } else {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]
    };
    Content { operations }.encode().expect("content stream encoding")
}

fn add_images(doc: &mut Document, images: &[TestImage]) -> Dictionary {
    let mut xobjects = Dictionary::new();
    for (i, image) in images.iter().enumerate() {
        let id: ObjectId = doc.add_object(Stream::new(image.dict.clone(), image.content.clone()));
        xobjects.set(format!("Im{}", i), id);
    }
    xobjects
}

fn encrypt_with_empty_password(doc: &mut Document) {
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 4,
        "R" => 4,
        "Length" => 128,
        "O" => Object::String(vec![0x5A; 32], StringFormat::Hexadecimal),
        "P" => -4,
        "CF" => dictionary! {
            "StdCF" => dictionary! { "CFM" => "V2", "Length" => 16 },
        },
        "StmF" => "StdCF",
        "StrF" => "StdCF",
    });
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::String(vec![0x11; 16], StringFormat::Hexadecimal),
            Object::String(vec![0x22; 16], StringFormat::Hexadecimal),
        ],
    );

    // Without /U the key derives from the empty password alone
    let key = get_encryption_key(doc, "", false).expect("encryption key");

    // RC4 is symmetric, so decrypting plaintext encrypts it
    for (&id, object) in doc.objects.iter_mut() {
        if id == encrypt_id {
            continue;
        }
        let Ok(encrypted) = decrypt_object(&key, id, object, false) else {
            continue;
        };
        match object {
            Object::Stream(stream) => stream.set_content(encrypted),
            Object::String(content, _) => *content = encrypted,
            _ => {}
        }
    }
}
