//! Shared helpers for core integration tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One chapter of a generated EPUB.
pub struct Chapter {
    pub file: String,
    pub nav_label: Option<String>,
    pub body: String,
}

impl Chapter {
    /// A chapter with an `<h1>` heading, a paragraph of prose and an outline entry.
    pub fn article(file: &str, heading: &str) -> Self {
        Self {
            file: file.to_string(),
            nav_label: Some(heading.to_string()),
            body: format!("<h1>{heading}</h1><p>{}</p>", prose(450)),
        }
    }

    pub fn raw(file: &str, body: &str) -> Self {
        Self {
            file: file.to_string(),
            nav_label: None,
            body: body.to_string(),
        }
    }
}

pub fn prose(chars: usize) -> String {
    let sentence = "Central bankers met again this week to weigh how quickly rates should fall. ";
    sentence.repeat(chars / sentence.len() + 1)
}

/// Build a minimal EPUB 2 archive in memory.
pub fn build_epub(title: &str, chapters: &[Chapter]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let mut add = |name: &str, content: &str| {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    };

    add("mimetype", "application/epub+zip");
    add(
        "META-INF/container.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
    );

    let manifest: String = chapters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                r#"<item id="c{i}" href="{}" media-type="application/xhtml+xml"/>"#,
                c.file
            )
        })
        .collect();
    let spine: String = (0..chapters.len())
        .map(|i| format!(r#"<itemref idref="c{i}"/>"#))
        .collect();
    add(
        "OEBPS/content.opf",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:identifier id="bookid">urn:uuid:0b7c4d7e-1c55-4c1b-9a8e-000000000001</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    {manifest}
  </manifest>
  <spine toc="ncx">{spine}</spine>
</package>"#
        ),
    );

    let nav_points: String = chapters
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            c.nav_label.as_ref().map(|label| {
                format!(
                    r#"<navPoint id="n{i}" playOrder="{}"><navLabel><text>{label}</text></navLabel><content src="{}"/></navPoint>"#,
                    i + 1,
                    c.file
                )
            })
        })
        .collect();
    add(
        "OEBPS/toc.ncx",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:0b7c4d7e-1c55-4c1b-9a8e-000000000001"/></head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>{nav_points}</navMap>
</ncx>"#
        ),
    );

    for chapter in chapters {
        add(
            &format!("OEBPS/{}", chapter.file),
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>{title}</title></head><body>{}</body></html>"#,
                chapter.body
            ),
        );
    }

    zip.finish().unwrap().into_inner()
}
