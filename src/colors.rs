//! Account and region colours.
//!
//! Two independent mappings:
//! - accounts get a stable colour in configuration order, with fixed colours
//!   for the reserved tags `m`, `a` and `o`
//! - location keys get a colour from a pinned string hash, so the same key is
//!   painted the same way in every artifact and every run

/// Reserved account tags (compared case-insensitively) and their colours.
const RESERVED_ACCOUNT_COLORS: [(&str, &str); 3] = [
    ("m", "#8b5cf6"), // violet
    ("a", "#10b981"), // green
    ("o", "#f97316"), // orange
];

/// Palette for all other accounts, handed out in order.
const ACCOUNT_PALETTE: [&str; 10] = [
    "#ef4444", "#3b82f6", "#10b981", "#f59e0b", "#8b5cf6", "#ec4899", "#06b6d4", "#84cc16",
    "#f97316", "#6366f1",
];

/// Palette for heatmap regions.
const REGION_PALETTE: [&str; 20] = [
    "#ef4444", "#f59e0b", "#eab308", "#84cc16", "#22c55e", "#10b981", "#14b8a6", "#06b6d4",
    "#0ea5e9", "#3b82f6", "#6366f1", "#8b5cf6", "#a855f7", "#d946ef", "#ec4899", "#f43f5e",
    "#fb923c", "#fbbf24", "#a3e635", "#4ade80",
];

fn reserved_color(account: &str) -> Option<&'static str> {
    let lower = account.to_lowercase();
    RESERVED_ACCOUNT_COLORS
        .iter()
        .find(|(tag, _)| *tag == lower)
        .map(|(_, color)| *color)
}

// ============================================================================
// Account colours
// ============================================================================

/// Account -> colour assignment for one run.
///
/// Colours depend only on the ordered list of accounts seen so far. A
/// non-reserved account takes the first palette colour that is neither used
/// by an earlier account nor owned by a reserved tag; once the palette is
/// exhausted colours repeat in palette order.
#[derive(Debug, Clone, Default)]
pub struct AccountPalette {
    assigned: Vec<(String, &'static str)>,
}

impl AccountPalette {
    /// Pre-assign colours to the configured accounts, in order.
    pub fn new<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut palette = Self::default();
        for account in accounts {
            palette.assign(account.as_ref());
        }
        palette
    }

    /// Colour for `account`, assigning one if it is new.
    pub fn assign(&mut self, account: &str) -> &'static str {
        if let Some(color) = self.lookup(account) {
            return color;
        }

        let color = reserved_color(account).unwrap_or_else(|| self.next_free_color());
        self.assigned.push((account.to_string(), color));
        color
    }

    /// Colour for an account; unknown accounts get the colour they would be
    /// assigned next, without recording it.
    pub fn color(&self, account: &str) -> &'static str {
        self.lookup(account)
            .or_else(|| reserved_color(account))
            .unwrap_or_else(|| self.next_free_color())
    }

    /// Accounts in assignment order.
    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.assigned.iter().map(|(name, _)| name.as_str())
    }

    fn lookup(&self, account: &str) -> Option<&'static str> {
        self.assigned
            .iter()
            .find(|(name, _)| name == account)
            .map(|(_, color)| *color)
    }

    /// Unused palette colours that no reserved tag owns come first, then any
    /// unused colour, then the palette cycles.
    fn next_free_color(&self) -> &'static str {
        let is_free = |candidate: &&'static str| {
            !self.assigned.iter().any(|(_, used)| used == candidate)
        };
        let is_reserved =
            |candidate: &&'static str| RESERVED_ACCOUNT_COLORS.iter().any(|(_, c)| c == candidate);

        ACCOUNT_PALETTE
            .iter()
            .copied()
            .find(|c| is_free(c) && !is_reserved(c))
            .or_else(|| ACCOUNT_PALETTE.iter().copied().find(|c| is_free(c)))
            .unwrap_or_else(|| ACCOUNT_PALETTE[self.assigned.len() % ACCOUNT_PALETTE.len()])
    }
}

// ============================================================================
// Region colours
// ============================================================================

/// Pinned 32-bit polynomial string hash: `h = h * 31 + code_point`, wrapping,
/// over the Unicode scalar values of `key`, starting from 0.
pub fn region_hash(key: &str) -> u32 {
    key.chars()
        .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32))
}

/// Heatmap colour for a location key.
pub fn region_color(key: &str) -> &'static str {
    REGION_PALETTE[region_hash(key) as usize % REGION_PALETTE.len()]
}

/// CSS-safe grouping identifier for an account (`route-{id}` classes and
/// toggle buttons).
pub fn account_css_id(account: &str) -> String {
    account
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
