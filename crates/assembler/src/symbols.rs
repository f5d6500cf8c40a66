//! Symbol table, location counter and local-label scope.
//!
//! Symbol values persist across both passes of one assembly run so that
//! pass 2 sees every label pass 1 defined. The location counter and the
//! enclosing-label scope are reset at the start of each pass.

use std::collections::BTreeMap;

/// Prefix marking a label as local to the most recent non-local label.
pub const LOCAL_MARKER: char = '.';

/// Label values plus the live location counter and local-label scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    values: BTreeMap<String, i64>,
    location: i64,
    scope: String,
}

impl SymbolTable {
    /// Creates an empty table with the location counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the location counter and scope for a new pass, keeping symbol values.
    pub fn begin_pass(&mut self) {
        self.location = 0;
        self.scope.clear();
    }

    /// Looks up a symbol by its fully-qualified name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    /// Binds `name` to `value`. A later definition of the same name wins.
    pub fn define(&mut self, name: impl Into<String>, value: i64) {
        self.values.insert(name.into(), value);
    }

    /// Current location counter.
    #[must_use]
    pub const fn location(&self) -> i64 {
        self.location
    }

    /// Moves the location counter.
    pub const fn set_location(&mut self, value: i64) {
        self.location = value;
    }

    /// Advances the location counter by `amount`.
    ///
    /// Returns `false` when the sum overflows; the counter then saturates.
    pub const fn advance(&mut self, amount: i64) -> bool {
        match self.location.checked_add(amount) {
            Some(location) => {
                self.location = location;
                true
            }
            None => {
                self.location = self.location.saturating_add(amount);
                false
            }
        }
    }

    /// Name of the most recent non-local label.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Rewrites a local name (`.x`) to `<scope>_x`; other names are returned unchanged.
    #[must_use]
    pub fn qualify(&self, name: &str) -> String {
        name.strip_prefix(LOCAL_MARKER)
            .map_or_else(|| name.to_string(), |suffix| format!("{}_{suffix}", self.scope))
    }

    /// Records a label found in the label column of a source line.
    ///
    /// Local labels are qualified with the current scope. Any other label
    /// becomes the new scope for the lines that follow.
    pub fn enter_label(&mut self, label: &str) -> String {
        if label.starts_with(LOCAL_MARKER) {
            self.qualify(label)
        } else {
            self.scope = label.to_string();
            label.to_string()
        }
    }

    /// Every symbol in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|(name, &value)| (name.as_str(), value))
    }

    /// Number of defined symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when no symbol is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rounds `location` up to the next multiple of `alignment` (at least 1).
///
/// Returns `None` when the rounded value does not fit an `i64`.
#[must_use]
pub const fn align_up(location: i64, alignment: i64) -> Option<i64> {
    let k = if alignment < 1 { 1 } else { alignment };
    match location.rem_euclid(k) {
        0 => Some(location),
        rem => location.checked_add(k - rem),
    }
}
