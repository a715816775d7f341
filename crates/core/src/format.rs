//! Display helpers shared by anomaly and recommendation text.

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

/// Human-readable binary size: `512 B`, `1.5 KB`, `60.0 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const SUFFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}B", bytes as f64 / div as f64, SUFFIXES[exp])
}

/// Compact decimal count: `999`, `1.5K`, `11.0M`, `2.3B`.
pub fn format_number(num: u64) -> String {
    if num < 1_000 {
        format!("{}", num)
    } else if num < 1_000_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else if num < 1_000_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else {
        format!("{:.1}B", num as f64 / 1_000_000_000.0)
    }
}

/// Shorten a key for display, keeping the first `max_chars - 3` characters
/// followed by `...`. Counts characters, not bytes.
pub fn truncate_key(key: &str, max_chars: usize) -> String {
    if key.chars().count() <= max_chars {
        return key.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = key.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// `part / whole * 100`, or 0 when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
