//! Lays out parsed markup blocks on A4 pages and serializes the result
//! with lopdf. Text is set in embedded TrueType fonts addressed by glyph
//! id, so any script a face in the [`FontBook`] covers survives.

use std::collections::BTreeMap;
use std::mem;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{Face, GlyphId};

use super::fonts::{FontBook, FontSource, Weight};
use super::markup::Block;
use super::ExportError;

pub const PAGE_WIDTH: i64 = 595;
pub const PAGE_HEIGHT: i64 = 842;
pub const MARGIN: i64 = 56;
const CONTENT_WIDTH: i64 = PAGE_WIDTH - 2 * MARGIN;

const BODY_SIZE: i64 = 11;
/// Longest side of an embedded image, in points.
const IMAGE_MAX: i64 = 170;

/// One face of a chain plus the glyphs the document has drawn with it.
struct Embedded<'a> {
    source: &'a FontSource,
    face: Face<'a>,
    resource: String,
    /// glyph id -> (advance in 1/1000 em, character it was drawn for)
    used: BTreeMap<u16, (i64, char)>,
}

impl Embedded<'_> {
    fn advance(&self, glyph: GlyphId) -> i64 {
        let units = self.face.glyph_hor_advance(glyph).unwrap_or(0) as i64;
        units * 1000 / self.face.units_per_em() as i64
    }

    fn scale(&self, v: i16) -> i64 {
        v as i64 * 1000 / self.face.units_per_em() as i64
    }
}

/// Faces tried in order for every character.
struct FontChain<'a> {
    fonts: Vec<Embedded<'a>>,
}

impl<'a> FontChain<'a> {
    fn new(sources: &'a [FontSource], prefix: char) -> Result<Self, ExportError> {
        let fonts = sources
            .iter()
            .enumerate()
            .map(|(i, source)| -> Result<Embedded<'a>, ExportError> {
                Ok(Embedded {
                    source,
                    face: source.face()?,
                    resource: format!("{prefix}{}", i + 1),
                    used: BTreeMap::new(),
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { fonts })
    }

    /// First face with a glyph for `c`; `.notdef` of the primary face
    /// when none has one.
    fn glyph(&self, c: char) -> (usize, GlyphId) {
        self.fonts
            .iter()
            .enumerate()
            .find_map(|(i, f)| f.face.glyph_index(c).map(|g| (i, g)))
            .unwrap_or((0, GlyphId(0)))
    }

    fn char_width(&self, c: char) -> i64 {
        let (font, glyph) = self.glyph(c);
        self.fonts[font].advance(glyph)
    }

    /// Width of `text` in thousandths of a point.
    fn text_width(&self, text: &str, size: i64) -> i64 {
        text.chars().map(|c| self.char_width(c)).sum::<i64>() * size
    }

    /// Split `text` into runs of big-endian glyph ids per font resource,
    /// recording every glyph for the font's width and ToUnicode tables.
    fn encode(&mut self, text: &str) -> Vec<(String, Vec<u8>)> {
        let mut runs: Vec<(usize, Vec<u8>)> = Vec::new();
        for c in text.chars() {
            let (font, glyph) = self.glyph(c);
            let width = self.fonts[font].advance(glyph);
            self.fonts[font].used.entry(glyph.0).or_insert((width, c));
            match runs.last_mut() {
                Some((last, bytes)) if *last == font => bytes.extend(glyph.0.to_be_bytes()),
                _ => runs.push((font, glyph.0.to_be_bytes().to_vec())),
            }
        }
        runs.into_iter()
            .map(|(font, bytes)| (self.fonts[font].resource.clone(), bytes))
            .collect()
    }
}

/// Greedy word wrap to `max_width` points. Words longer than a line are
/// broken between characters, never before a zero-width mark.
fn wrap(chain: &FontChain<'_>, text: &str, size: i64, max_width: i64) -> Vec<String> {
    let limit = max_width * 1000;
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if chain.text_width(&candidate, size) <= limit {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(mem::take(&mut current));
        }
        for c in word.chars() {
            current.push(c);
            if chain.text_width(&current, size) > limit
                && current.chars().count() > 1
                && chain.char_width(c) > 0
            {
                current.pop();
                lines.push(mem::take(&mut current));
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn line_height(size: i64) -> i64 {
    (size * 14 + 9) / 10
}

fn name(s: &str) -> Object {
    Object::Name(s.as_bytes().to_vec())
}

/// PDF text string: UTF-16BE behind a byte order mark.
fn text_string(s: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend(unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

struct Layout<'a> {
    regular: FontChain<'a>,
    bold: FontChain<'a>,
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: i64,
}

impl<'a> Layout<'a> {
    fn new(book: &'a FontBook) -> Result<Self, ExportError> {
        Ok(Self {
            regular: FontChain::new(book.sources(Weight::Regular), 'R')?,
            bold: FontChain::new(book.sources(Weight::Bold), 'B')?,
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    fn at_top(&self) -> bool {
        self.y == PAGE_HEIGHT - MARGIN
    }

    fn new_page(&mut self) {
        self.pages.push(mem::take(&mut self.ops));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Start a new page unless `height` more points fit on this one.
    fn reserve(&mut self, height: i64) {
        if self.y - height < MARGIN && !self.at_top() {
            self.new_page();
        }
    }

    fn gap(&mut self, height: i64) {
        if !self.at_top() {
            self.y = (self.y - height).max(MARGIN);
        }
    }

    fn paragraph(&mut self, text: &str, weight: Weight, size: i64) {
        let lh = line_height(size);
        let lines = match weight {
            Weight::Regular => wrap(&self.regular, text, size, CONTENT_WIDTH),
            Weight::Bold => wrap(&self.bold, text, size, CONTENT_WIDTH),
        };
        for line in lines {
            self.reserve(lh);
            self.y -= lh;
            let runs = match weight {
                Weight::Regular => self.regular.encode(&line),
                Weight::Bold => self.bold.encode(&line),
            };
            self.ops.push(Operation::new("BT", vec![]));
            self.ops.push(Operation::new(
                "Td",
                vec![MARGIN.into(), (self.y + lh / 4).into()],
            ));
            for (resource, glyphs) in runs {
                self.ops.push(Operation::new("Tf", vec![name(&resource), size.into()]));
                self.ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(glyphs, StringFormat::Hexadecimal)],
                ));
            }
            self.ops.push(Operation::new("ET", vec![]));
        }
    }

    fn rule(&mut self) {
        self.reserve(14);
        self.gap(7);
        self.ops.extend([
            Operation::new("G", vec![0.6f32.into()]),
            Operation::new("w", vec![1.into()]),
            Operation::new("m", vec![MARGIN.into(), self.y.into()]),
            Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), self.y.into()]),
            Operation::new("S", vec![]),
            Operation::new("G", vec![0.into()]),
        ]);
        self.gap(7);
    }

    fn image(&mut self, resource: &str, px_width: u32, px_height: u32) {
        let (w, h) = fit(px_width as i64, px_height as i64);
        self.reserve(h + 6);
        self.gap(6);
        self.y -= h;
        self.ops.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    w.into(),
                    0.into(),
                    0.into(),
                    h.into(),
                    MARGIN.into(),
                    self.y.into(),
                ],
            ),
            Operation::new("Do", vec![name(resource)]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn finish(&mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        mem::take(&mut self.pages)
    }

    fn used_fonts(&self) -> impl Iterator<Item = &Embedded<'a>> {
        self.regular
            .fonts
            .iter()
            .chain(&self.bold.fonts)
            .filter(|f| !f.used.is_empty())
    }
}

/// Display size in points: at most `IMAGE_MAX` on the long side, never
/// larger than the pixel size, aspect kept.
fn fit(w: i64, h: i64) -> (i64, i64) {
    let long = w.max(h).max(1);
    if long <= IMAGE_MAX {
        return (w.max(1), h.max(1));
    }
    ((w * IMAGE_MAX / long).max(1), (h * IMAGE_MAX / long).max(1))
}

fn heading_style(level: u8) -> (i64, i64) {
    // (font size, space above)
    match level {
        1 => (22, 4),
        2 => (16, 10),
        _ => (13, 8),
    }
}

/// Glyph id to text map so the PDF text can be searched and copied.
fn to_unicode(used: &BTreeMap<u16, (i64, char)>) -> Vec<u8> {
    let entries: Vec<String> = used
        .iter()
        .filter(|(gid, _)| **gid != 0)
        .map(|(gid, (_, c))| {
            let mut units = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            format!("<{gid:04X}> <{hex}>")
        })
        .collect();

    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );
    // at most 100 entries per bfchar section
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for entry in chunk {
            cmap.push_str(entry);
            cmap.push('\n');
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap.into_bytes()
}

/// Embed `font` as a Type0 font over an Identity-mapped CIDFontType2.
fn embed_font(doc: &mut Document, font: &Embedded<'_>) -> Result<ObjectId, ExportError> {
    let data = font.source.data();
    let mut file = Stream::new(
        dictionary! { "Length1" => data.len() as i64 },
        data.to_vec(),
    );
    file.compress()?;
    let file_id = doc.add_object(file);

    let face = &font.face;
    let bbox = face.global_bounding_box();
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => font.source.name(),
        // nonsymbolic
        "Flags" => 32,
        "FontBBox" => vec![
            font.scale(bbox.x_min).into(),
            font.scale(bbox.y_min).into(),
            font.scale(bbox.x_max).into(),
            font.scale(bbox.y_max).into(),
        ],
        "ItalicAngle" => 0,
        "Ascent" => font.scale(face.ascender()),
        "Descent" => font.scale(face.descender()),
        "CapHeight" => font.scale(face.capital_height().unwrap_or(face.ascender())),
        "StemV" => 80,
        "FontFile2" => file_id,
    });

    let mut widths: Vec<Object> = Vec::new();
    for (gid, (width, _)) in &font.used {
        widths.push((*gid as i64).into());
        widths.push(vec![Object::from(*width)].into());
    }
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => font.source.name(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, to_unicode(&font.used)));
    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => font.source.name(),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => to_unicode_id,
    }))
}

/// Render `blocks` to PDF bytes with the faces in `book`. `title` goes
/// into the document info.
pub fn render(blocks: &[Block], title: &str, book: &FontBook) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut xobjects = Dictionary::new();
    let mut layout = Layout::new(book)?;
    for block in blocks {
        match block {
            Block::Heading(level, text) => {
                let (size, above) = heading_style(*level);
                layout.gap(above);
                layout.paragraph(text, Weight::Bold, size);
            }
            Block::Text(text) => layout.paragraph(text, Weight::Regular, BODY_SIZE),
            Block::Blank => layout.gap(BODY_SIZE / 2),
            Block::Rule => layout.rule(),
            Block::Image(bytes) => {
                let gray = image::load_from_memory(bytes)?.to_luma8();
                let (w, h) = gray.dimensions();
                let resource = format!("Im{}", xobjects.len() + 1);
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => w as i64,
                        "Height" => h as i64,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    gray.into_raw(),
                ));
                xobjects.set(resource.as_bytes().to_vec(), image_id);
                layout.image(&resource, w, h);
            }
        }
    }

    let pages = layout.finish();
    let mut fonts = Dictionary::new();
    for font in layout.used_fonts() {
        let font_id = embed_font(&mut doc, font)?;
        fonts.set(font.resource.as_bytes().to_vec(), font_id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
        "XObject" => xobjects,
    });

    let mut kids: Vec<Object> = Vec::new();
    for ops in pages {
        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(title),
        "Producer" => Object::string_literal("Smafolio"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
