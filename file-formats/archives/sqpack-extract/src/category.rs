//! Mapping of logical paths to archive categories
//!
//! Every logical path belongs to exactly one category, and every category has
//! its own index. A category id is 24 bits wide: the top-level group sits in
//! bits 16..24, and groups that are split per expansion fold
//! `expansion << 8 | zone` into the low 16 bits.

/// `common/`
pub const COMMON: u32 = 0x000000;
/// `bgcommon/`
pub const BG_COMMON: u32 = 0x010000;
/// `bg/`, split by expansion and zone
pub const BG: u32 = 0x020000;
/// `cut/`, split by expansion
pub const CUT: u32 = 0x030000;
/// `chara/`
pub const CHARA: u32 = 0x040000;
/// `shader/`
pub const SHADER: u32 = 0x050000;
/// `ui/`
pub const UI: u32 = 0x060000;
/// `sound/`
pub const SOUND: u32 = 0x070000;
/// `vfx/`
pub const VFX: u32 = 0x080000;
/// `ui_script/`
pub const UI_SCRIPT: u32 = 0x090000;
/// `exd/`, the sheet data this crate extracts
pub const EXD: u32 = 0x0A0000;
/// `game_script/`
pub const GAME_SCRIPT: u32 = 0x0B0000;
/// `music/`, split by expansion
pub const MUSIC: u32 = 0x0C0000;
/// `_sqpack_test/`
pub const SQPACK_TEST: u32 = 0x120000;
/// `_debug/`
pub const DEBUG: u32 = 0x130000;

/// Base categories a complete manifest is expected to carry an index for
///
/// The ui-script group never ships an index, so it is not part of the set.
pub const KNOWN_CATEGORIES: [u32; 14] = [
    COMMON,
    BG_COMMON,
    BG,
    CUT,
    CHARA,
    SHADER,
    UI,
    SOUND,
    VFX,
    EXD,
    GAME_SCRIPT,
    MUSIC,
    SQPACK_TEST,
    DEBUG,
];

/// Resolve the category id for a logical path
///
/// Unknown prefixes resolve to [`COMMON`] (0). Paths too short to carry the
/// expansion marker of a split group resolve to the group's base id.
pub fn category_for_path(path: &str) -> u32 {
    let bytes = path.as_bytes();
    let starts = |tag: &str| bytes.starts_with(tag.as_bytes());

    if starts("com") {
        COMMON
    } else if starts("bgc") {
        BG_COMMON
    } else if starts("bg/") {
        BG | bg_sub_category(bytes)
    } else if starts("cut") {
        CUT | expansion_sub_category(bytes, 4)
    } else if starts("cha") {
        CHARA
    } else if starts("sha") {
        SHADER
    } else if starts("ui/") {
        UI
    } else if starts("sou") {
        SOUND
    } else if starts("vfx") {
        VFX
    } else if starts("ui_") {
        UI_SCRIPT
    } else if starts("exd") {
        EXD
    } else if starts("gam") {
        GAME_SCRIPT
    } else if starts("mus") {
        MUSIC | expansion_sub_category(bytes, 6)
    } else if starts("_sq") {
        SQPACK_TEST
    } else if starts("_de") {
        DEBUG
    } else {
        0
    }
}

/// Group id (bits 16..24) of a category
pub fn group_of(category: u32) -> u32 {
    category & 0xFF_0000
}

/// Expansion number folded into a category, 0 for the base game
pub fn expansion_of(category: u32) -> u32 {
    (category >> 8) & 0xFF
}

/// Parse an ASCII decimal slice, `None` when empty or non-numeric
fn parse_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    bytes
        .iter()
        .try_fold(0u32, |acc, &b| acc.checked_mul(10)?.checked_add((b - b'0') as u32))
}

/// `bg/exN/ZZ_...` → `N << 8 | ZZ`
fn bg_sub_category(path: &[u8]) -> u32 {
    if path.get(3) != Some(&b'e') {
        return 0;
    }

    let (expansion, zone_start) = match (path.get(6), path.get(7)) {
        (Some(b'/'), _) => (path.get(5..6).and_then(parse_digits), 7),
        (_, Some(b'/')) => (path.get(5..7).and_then(parse_digits), 8),
        _ => return 0,
    };

    let Some(expansion) = expansion else {
        return 0;
    };
    let Some(zone) = path.get(zone_start..zone_start + 2).and_then(parse_digits) else {
        return 0;
    };

    (expansion << 8) + zone
}

/// `<dir>/exN/...` → `N << 8`, where `first_dir_len` includes the slash
fn expansion_sub_category(path: &[u8], first_dir_len: usize) -> u32 {
    if path.get(first_dir_len) != Some(&b'e') {
        return 0;
    }

    let digits = if path.get(first_dir_len + 3) == Some(&b'/') {
        path.get(first_dir_len + 2..first_dir_len + 3)
    } else if path.get(first_dir_len + 4) == Some(&b'/') {
        path.get(first_dir_len + 2..first_dir_len + 4)
    } else {
        None
    };

    digits.and_then(parse_digits).map_or(0, |expansion| expansion << 8)
}
