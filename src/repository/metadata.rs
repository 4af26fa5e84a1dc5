// src/repository/metadata.rs

//! Channel metadata parser
//!
//! Each channel publishes a `packages.xml` (usually gzip-compressed) that
//! lists the troves on its label:
//!
//! ```xml
//! <Packages>
//!   <Package>
//!     <name>gimp</name>
//!     <version>/foresight.rpath.org@fl:2/2.6.8-1-1</version>
//!     <flavor>is: x86_64</flavor>
//!     <shortDesc>GNU Image Manipulation Program</shortDesc>
//!     <longDesc>...</longDesc>
//!     <url>http://www.gimp.org/</url>
//!     <licenses><license>rpath.com/licenses/copyright/GPL-2</license></licenses>
//!     <category>Graphics</category>
//!     <size>18522112</size>
//!     <requires><trove>gtk</trove></requires>
//!     <files><file>/usr/bin/gimp</file></files>
//!   </Package>
//! </Packages>
//! ```

use crate::error::{Error, Result};
use crate::version;
use flate2::read::GzDecoder;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::Read;
use tracing::{debug, warn};

/// Gzip magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One trove entry from a channel's metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub flavor: String,
    pub label: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub licenses: Vec<String>,
    pub category: Option<String>,
    pub size: i64,
    pub requires: Vec<String>,
    pub files: Vec<String>,
}

/// Decode a metadata payload, decompressing gzip when present
pub fn decode_payload(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(&GZIP_MAGIC) {
        debug!("Decompressing gzip-compressed metadata");
        let mut gz = GzDecoder::new(bytes);
        let mut decompressed = String::new();
        gz.read_to_string(&mut decompressed)
            .map_err(|e| Error::ParseError(format!("Failed to decompress metadata: {}", e)))?;
        return Ok(decompressed);
    }

    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in metadata: {}", e)))
}

/// Parse a channel's `packages.xml`
///
/// Entries without a name or version are skipped with a warning.
pub fn parse_metadata(xml_content: &str) -> Result<Vec<PackageMetadata>> {
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    let mut packages = Vec::new();
    let mut buf = Vec::new();

    let mut current: Option<PackageMetadata> = None;
    let mut current_tag = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                current_tag = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
                if current_tag == "package" {
                    current = Some(PackageMetadata::default());
                }
            }
            Event::Text(e) => {
                if let Some(pkg) = current.as_mut() {
                    let text = e.unescape()?.into_owned();
                    assign_field(pkg, &current_tag, text)?;
                }
            }
            Event::CData(e) => {
                if let Some(pkg) = current.as_mut() {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    assign_field(pkg, &current_tag, text)?;
                }
            }
            Event::End(e) => {
                if e.name().as_ref().eq_ignore_ascii_case(b"package") {
                    if let Some(pkg) = current.take() {
                        if pkg.name.is_empty() || pkg.version.is_empty() {
                            warn!("Skipping metadata entry without name or version");
                        } else {
                            packages.push(finish(pkg));
                        }
                    }
                }
                current_tag.clear();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!("Parsed {} metadata entries", packages.len());
    Ok(packages)
}

fn assign_field(pkg: &mut PackageMetadata, tag: &str, text: String) -> Result<()> {
    match tag {
        "name" => pkg.name = text,
        "version" => pkg.version = text,
        "flavor" => pkg.flavor = text,
        "label" => pkg.label = Some(text),
        "shortdesc" => pkg.summary = Some(text),
        "longdesc" => pkg.description = Some(text),
        "url" => pkg.url = Some(text),
        "license" => pkg.licenses.push(text),
        "category" => pkg.category = Some(text),
        "size" => {
            pkg.size = text
                .trim()
                .parse()
                .map_err(|e| Error::ParseError(format!("Invalid size '{}': {}", text, e)))?
        }
        "trove" => pkg.requires.push(text),
        "file" => pkg.files.push(text),
        _ => {}
    }
    Ok(())
}

/// Fill in the label from the version when the entry omits it
fn finish(mut pkg: PackageMetadata) -> PackageMetadata {
    if pkg.label.is_none() {
        pkg.label = version::label(&pkg.version).map(str::to_string);
    }
    pkg
}
