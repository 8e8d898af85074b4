//! Sheet list and sheet header files
//!
//! The set of logical paths an extraction must resolve is not fixed: it is
//! read from the archive itself. `exd/root.exl` lists every sheet, each
//! sheet's `.exh` header declares its row pages and languages, and every
//! page × language pair is one `.exd` data file.

use crate::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Logical path of the sheet list
pub const ROOT_LIST_PATH: &str = "exd/root.exl";

/// Magic at the start of the sheet list
pub const SHEET_LIST_MAGIC: &str = "EXLT";

/// Magic at the start of a sheet header
pub const SHEET_HEADER_MAGIC: &[u8; 4] = b"EXHF";

/// Size of the fixed part of a sheet header
pub const SHEET_HEADER_SIZE: u64 = 32;

/// Logical path of a sheet's header
pub fn header_path(sheet: &str) -> String {
    format!("exd/{sheet}.exh")
}

/// Parsed `root.exl`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetList {
    sheets: Vec<(String, i32)>,
}

impl SheetList {
    /// Parse the text sheet list
    ///
    /// Lines that are not `Name,Id` pairs are skipped.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(data);
        let mut lines = text.lines();

        match lines.next() {
            Some(header) if header.starts_with(SHEET_LIST_MAGIC) => {}
            _ => return Err(Error::invalid_format("sheet list lacks EXLT header")),
        }

        let mut sheets = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((name, id)) = line.rsplit_once(',') else {
                log::debug!("Skipping sheet list line {line:?}");
                continue;
            };
            let Ok(id) = id.trim().parse::<i32>() else {
                log::debug!("Skipping sheet list line {line:?}");
                continue;
            };
            sheets.push((name.to_string(), id));
        }

        Ok(Self { sheets })
    }

    /// Sheet names in list order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|(name, _)| name.as_str())
    }

    /// `(name, id)` pairs in list order; id is -1 for unnumbered sheets
    pub fn entries(&self) -> &[(String, i32)] {
        &self.sheets
    }

    /// Number of sheets
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// Whether the list has no sheets
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// Language of a data page
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Language-neutral page
    None = 0,
    /// Japanese
    Japanese = 1,
    /// English
    English = 2,
    /// German
    German = 3,
    /// French
    French = 4,
    /// Simplified Chinese
    ChineseSimplified = 5,
    /// Traditional Chinese
    ChineseTraditional = 6,
    /// Korean
    Korean = 7,
    /// Traditional Chinese, Taiwan client
    ChineseTraditionalTw = 8,
}

impl Language {
    /// Create from the raw header value
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Language::None),
            1 => Some(Language::Japanese),
            2 => Some(Language::English),
            3 => Some(Language::German),
            4 => Some(Language::French),
            5 => Some(Language::ChineseSimplified),
            6 => Some(Language::ChineseTraditional),
            7 => Some(Language::Korean),
            8 => Some(Language::ChineseTraditionalTw),
            _ => None,
        }
    }

    /// File name suffix, empty for [`Language::None`]
    pub fn code(&self) -> &'static str {
        match self {
            Language::None => "",
            Language::Japanese => "ja",
            Language::English => "en",
            Language::German => "de",
            Language::French => "fr",
            Language::ChineseSimplified => "chs",
            Language::ChineseTraditional => "cht",
            Language::Korean => "ko",
            Language::ChineseTraditionalTw => "tc",
        }
    }
}

/// Column declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column data type
    pub column_type: u16,
    /// Byte offset within a row
    pub offset: u16,
}

/// Row page declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDefinition {
    /// First row id in the page
    pub start_id: u32,
    /// Number of rows in the page
    pub row_count: u32,
}

/// Parsed `.exh` sheet header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetHeader {
    /// Header version
    pub version: u16,
    /// Size of the fixed row part
    pub data_offset: u16,
    /// Row layout variant
    pub variant: u8,
    /// Total rows across pages
    pub row_count: u32,
    /// Columns
    pub columns: Vec<ColumnDefinition>,
    /// Row pages
    pub pages: Vec<PageDefinition>,
    /// Languages with their own data files; unknown ids are dropped
    pub languages: Vec<Language>,
}

impl SheetHeader {
    /// Parse a big-endian sheet header
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(data);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != SHEET_HEADER_MAGIC {
            return Err(Error::invalid_format(format!(
                "sheet header magic {magic:02X?}"
            )));
        }

        let version = reader.read_u16::<BigEndian>()?;
        let data_offset = reader.read_u16::<BigEndian>()?;
        let column_count = reader.read_u16::<BigEndian>()?;
        let page_count = reader.read_u16::<BigEndian>()?;
        let language_count = reader.read_u16::<BigEndian>()?;
        let _unknown = reader.read_u16::<BigEndian>()?;
        let _unknown = reader.read_u8()?;
        let variant = reader.read_u8()?;
        let _unknown = reader.read_u16::<BigEndian>()?;
        let row_count = reader.read_u32::<BigEndian>()?;
        reader.seek(SeekFrom::Start(SHEET_HEADER_SIZE))?;

        let mut columns = Vec::with_capacity(column_count as usize);
        for _ in 0..column_count {
            columns.push(ColumnDefinition {
                column_type: reader.read_u16::<BigEndian>()?,
                offset: reader.read_u16::<BigEndian>()?,
            });
        }

        let mut pages = Vec::with_capacity(page_count as usize);
        for _ in 0..page_count {
            pages.push(PageDefinition {
                start_id: reader.read_u32::<BigEndian>()?,
                row_count: reader.read_u32::<BigEndian>()?,
            });
        }

        let mut languages = Vec::with_capacity(language_count as usize);
        for _ in 0..language_count {
            let raw = reader.read_u8()?;
            let _padding = reader.read_u8()?;
            match Language::from_raw(raw) {
                Some(language) => languages.push(language),
                None => log::debug!("Skipping unknown sheet language {raw}"),
            }
        }

        Ok(Self {
            version,
            data_offset,
            variant,
            row_count,
            columns,
            pages,
            languages,
        })
    }

    /// Logical paths of every data file of `sheet`, language-major
    pub fn data_page_paths(&self, sheet: &str) -> Vec<String> {
        let mut paths = Vec::with_capacity(self.languages.len() * self.pages.len());
        for language in &self.languages {
            for page in &self.pages {
                paths.push(match language {
                    Language::None => format!("exd/{sheet}_{}.exd", page.start_id),
                    _ => format!("exd/{sheet}_{}_{}.exd", page.start_id, language.code()),
                });
            }
        }
        paths
    }
}
