//! Helpers for the export tests: a tiny Thai-only TrueType font and a reader
//! for the text a rendered PDF shows.

use std::collections::HashMap;

use lopdf::{Document, Object};

pub const THAI_FIRST: u32 = 0x0E01;
pub const THAI_LAST: u32 = 0x0E5B;

/// A minimal TrueType font mapping U+0E01..=U+0E5B to glyphs 1.. with
/// empty outlines, 600 units wide on a 1000 unit em.
pub fn thai_only_font() -> Vec<u8> {
    let num_glyphs = (THAI_LAST - THAI_FIRST + 2) as u16;

    let mut cmap = Vec::new();
    cmap.extend(0u16.to_be_bytes()); // version
    cmap.extend(1u16.to_be_bytes()); // subtables
    cmap.extend(3u16.to_be_bytes()); // windows
    cmap.extend(10u16.to_be_bytes()); // full unicode
    cmap.extend(12u32.to_be_bytes());
    cmap.extend(12u16.to_be_bytes()); // format 12
    cmap.extend(0u16.to_be_bytes());
    cmap.extend(28u32.to_be_bytes());
    cmap.extend(0u32.to_be_bytes());
    cmap.extend(1u32.to_be_bytes());
    cmap.extend(THAI_FIRST.to_be_bytes());
    cmap.extend(THAI_LAST.to_be_bytes());
    cmap.extend(1u32.to_be_bytes());

    let glyf = vec![0u8; 4];

    let mut head = Vec::new();
    head.extend(1u16.to_be_bytes());
    head.extend(0u16.to_be_bytes());
    head.extend(0x0001_0000u32.to_be_bytes());
    head.extend(0u32.to_be_bytes());
    head.extend(0x5F0F_3CF5u32.to_be_bytes());
    head.extend(0u16.to_be_bytes());
    head.extend(1000u16.to_be_bytes());
    head.extend([0u8; 16]);
    for v in [0i16, -200, 600, 800] {
        head.extend(v.to_be_bytes());
    }
    head.extend(0u16.to_be_bytes());
    head.extend(8u16.to_be_bytes());
    head.extend(2i16.to_be_bytes());
    head.extend(0i16.to_be_bytes()); // short loca
    head.extend(0i16.to_be_bytes());

    let mut hhea = Vec::new();
    hhea.extend(0x0001_0000u32.to_be_bytes());
    for v in [800i16, -200, 0] {
        hhea.extend(v.to_be_bytes());
    }
    hhea.extend(600u16.to_be_bytes());
    for v in [0i16, 0, 600, 1, 0, 0, 0, 0, 0, 0, 0] {
        hhea.extend(v.to_be_bytes());
    }
    hhea.extend(num_glyphs.to_be_bytes());

    let mut hmtx = Vec::new();
    for _ in 0..num_glyphs {
        hmtx.extend(600u16.to_be_bytes());
        hmtx.extend(0i16.to_be_bytes());
    }

    let loca = vec![0u8; (num_glyphs as usize + 1) * 2];

    let mut maxp = Vec::new();
    maxp.extend(0x0000_5000u32.to_be_bytes());
    maxp.extend(num_glyphs.to_be_bytes());

    // table records must be sorted by tag
    let tables: [(&[u8; 4], Vec<u8>); 7] = [
        (b"cmap", cmap),
        (b"glyf", glyf),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"loca", loca),
        (b"maxp", maxp),
    ];

    let mut out = Vec::new();
    out.extend(0x0001_0000u32.to_be_bytes());
    out.extend((tables.len() as u16).to_be_bytes());
    out.extend([0u8; 6]);
    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        out.extend(**tag);
        out.extend(0u32.to_be_bytes());
        out.extend((offset as u32).to_be_bytes());
        out.extend((data.len() as u32).to_be_bytes());
        let mut padded = data.clone();
        while padded.len() % 4 != 0 {
            padded.push(0);
        }
        offset += padded.len();
        body.extend(padded);
    }
    out.extend(body);
    out
}

/// One entry per `BT`..`ET` block on the first page: the font resources
/// used and the text recovered through each font's ToUnicode map.
pub fn shown_text(pdf: &[u8]) -> Vec<(Vec<String>, String)> {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    let pages = doc
        .get_dictionary(page.get(b"Parent").unwrap().as_reference().unwrap())
        .unwrap();
    let resources = doc
        .get_dictionary(pages.get(b"Resources").unwrap().as_reference().unwrap())
        .unwrap();

    let mut maps: HashMap<Vec<u8>, HashMap<u16, String>> = HashMap::new();
    if let Ok(fonts) = resources.get(b"Font").and_then(Object::as_dict) {
        for (resource, font_ref) in fonts.iter() {
            let font = doc.get_dictionary(font_ref.as_reference().unwrap()).unwrap();
            let cmap_id = font.get(b"ToUnicode").unwrap().as_reference().unwrap();
            let cmap = doc.get_object(cmap_id).unwrap().as_stream().unwrap();
            maps.insert(resource.clone(), parse_to_unicode(&cmap.content));
        }
    }

    let mut out = Vec::new();
    let mut fonts_used: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut current: Vec<u8> = Vec::new();
    for op in doc.get_and_decode_page_content(page_id).unwrap().operations {
        match op.operator.as_str() {
            "BT" => {
                fonts_used.clear();
                text.clear();
            }
            "Tf" => {
                current = op.operands[0].as_name().unwrap().to_vec();
                fonts_used.push(String::from_utf8(current.clone()).unwrap());
            }
            "Tj" => {
                let map = &maps[&current];
                for pair in op.operands[0].as_str().unwrap().chunks(2) {
                    let gid = u16::from_be_bytes([pair[0], pair[1]]);
                    text.push_str(map.get(&gid).map(String::as_str).unwrap_or("\u{FFFD}"));
                }
            }
            "ET" => out.push((fonts_used.clone(), text.clone())),
            _ => {}
        }
    }
    out
}

fn parse_to_unicode(cmap: &[u8]) -> HashMap<u16, String> {
    let text = String::from_utf8_lossy(cmap);
    let mut map = HashMap::new();
    let mut in_bfchar = false;
    for line in text.lines() {
        if line.ends_with("beginbfchar") {
            in_bfchar = true;
            continue;
        }
        if line == "endbfchar" {
            in_bfchar = false;
        }
        if !in_bfchar {
            continue;
        }
        let hex: Vec<&str> = line
            .split(|c| c == '<' || c == '>')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let gid = u16::from_str_radix(hex[0], 16).unwrap();
        let units: Vec<u16> = (0..hex[1].len() / 4)
            .map(|i| u16::from_str_radix(&hex[1][i * 4..i * 4 + 4], 16).unwrap())
            .collect();
        map.insert(gid, String::from_utf16(&units).unwrap());
    }
    map
}
