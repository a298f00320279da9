use core::fmt::{self, Display};

use crate::catalogue::Catalogue;

use super::LayoutDecoder;

/// Sanity ceilings and traversal caps.
///
/// The defaults match what a debugger front-end can comfortably display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Largest element count accepted for contiguous containers and deques.
    pub max_sane_count: u64,
    /// Largest element count accepted for trees and hash tables.
    pub max_sane_tree_count: u64,
    /// Largest string length / capacity accepted.
    pub max_sane_string: u64,
    /// How far an uncached list length is counted before giving up.
    pub list_count_cap: u64,
    /// Overrides every per-kind child cap.
    pub max_children: Option<u64>,
    /// Characters shown in a string summary before eliding.
    pub display_string_limit: u64,
    /// Characters shown in the `text` child of the separate string formats.
    pub separate_string_limit: u64,
    /// Deepest allowed chain of nested decoders.
    pub max_depth: usize,
    /// Pointer dereferences allowed in a single structure walk.
    pub hop_budget: u64,
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            max_sane_count: 1000 * 1000 * 1000,
            max_sane_tree_count: 100 * 1000 * 1000,
            max_sane_string: 100 * 1000 * 1000,
            list_count_cap: 1000,
            max_children: None,
            display_string_limit: 100,
            separate_string_limit: 1000 * 1000,
            max_depth: 32,
            hop_budget: 100 * 1000,
        }
    }
}

impl Limits {
    /// The child cap for a container kind whose built-in cap is `default`.
    pub(crate) fn children(&self, default: u64) -> u64 {
        self.max_children.unwrap_or(default)
    }
}

/// An error which may occur when building a [`LayoutDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutDecoderBuilderError {
    /// A limit which must be non-zero was set to zero.
    ZeroLimit(&'static str),
    /// `display_string_limit` is larger than `separate_string_limit`.
    StringLimitMismatch,
    /// A sanity ceiling is lower than the child cap, so no container could
    /// ever fill its children.
    CeilingBelowCap(&'static str),
}

impl Display for LayoutDecoderBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::LayoutDecoderBuilderError::*;
        match self {
            ZeroLimit(what) => write!(f, "`{}` must be non-zero.", what),
            StringLimitMismatch => write!(
                f,
                "`display_string_limit` is larger than `separate_string_limit`."
            ),
            CeilingBelowCap(what) => {
                write!(f, "`{}` is lower than `max_children`.", what)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LayoutDecoderBuilderError {}

/// Helper to construct and customize [`LayoutDecoder`].
#[derive(Debug, Clone)]
pub struct LayoutDecoderBuilder {
    limits: Limits,
    catalogue: Option<Catalogue>,
}

impl Default for LayoutDecoderBuilder {
    fn default() -> Self {
        LayoutDecoderBuilder::new()
    }
}

impl LayoutDecoderBuilder {
    /// Create a new `LayoutDecoderBuilder` with default limits.
    pub fn new() -> LayoutDecoderBuilder {
        LayoutDecoderBuilder {
            limits: Limits::default(),
            catalogue: None,
        }
    }

    /// Replace all limits at once.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Largest element count accepted for contiguous containers. Defaults to
    /// 10^9.
    pub fn max_sane_count(mut self, max: u64) -> Self {
        self.limits.max_sane_count = max;
        self
    }

    /// Largest element count accepted for trees. Defaults to 10^8.
    pub fn max_sane_tree_count(mut self, max: u64) -> Self {
        self.limits.max_sane_tree_count = max;
        self
    }

    /// Largest string capacity accepted. Defaults to 10^8.
    pub fn max_sane_string(mut self, max: u64) -> Self {
        self.limits.max_sane_string = max;
        self
    }

    /// Stop counting uncached list lengths after `cap` nodes. Defaults to
    /// 1000.
    pub fn list_count_cap(mut self, cap: u64) -> Self {
        self.limits.list_count_cap = cap;
        self
    }

    /// Emit at most `cap` children per node, regardless of container kind.
    ///
    /// By default, each container kind uses its own cap (10000 for vectors
    /// and EASTL hash tables, 2000 for deques, 1000 for node-based
    /// containers).
    pub fn max_children(mut self, cap: u64) -> Self {
        self.limits.max_children = Some(cap);
        self
    }

    /// Characters shown in string summaries. Defaults to 100.
    pub fn display_string_limit(mut self, limit: u64) -> Self {
        self.limits.display_string_limit = limit;
        self
    }

    /// Characters shown in the separate `text` child. Defaults to 10^6.
    pub fn separate_string_limit(mut self, limit: u64) -> Self {
        self.limits.separate_string_limit = limit;
        self
    }

    /// Deepest allowed nesting of decoders. Defaults to 32.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.limits.max_depth = depth;
        self
    }

    /// Pointer dereferences allowed per structure walk. Defaults to 10^5.
    pub fn hop_budget(mut self, hops: u64) -> Self {
        self.limits.hop_budget = hops;
        self
    }

    /// Use a custom catalogue instead of [`Catalogue::standard`].
    pub fn catalogue(mut self, catalogue: Catalogue) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    /// Build the LayoutDecoder, returning an error if the limits don't make
    /// sense.
    pub fn build(self) -> Result<LayoutDecoder, LayoutDecoderBuilderError> {
        use self::LayoutDecoderBuilderError::*;

        let l = &self.limits;
        let non_zero: &[(&'static str, u64)] = &[
            ("list_count_cap", l.list_count_cap),
            ("max_depth", l.max_depth as u64),
            ("hop_budget", l.hop_budget),
            ("max_children", l.max_children.unwrap_or(1)),
        ];
        if let Some((what, _)) = non_zero.iter().find(|(_, v)| *v == 0) {
            return Err(ZeroLimit(*what));
        }

        if l.display_string_limit > l.separate_string_limit {
            return Err(StringLimitMismatch);
        }

        if let Some(cap) = l.max_children {
            if l.max_sane_count < cap {
                return Err(CeilingBelowCap("max_sane_count"));
            }
            if l.max_sane_tree_count < cap {
                return Err(CeilingBelowCap("max_sane_tree_count"));
            }
        }

        Ok(LayoutDecoder {
            limits: self.limits,
            catalogue: self.catalogue.unwrap_or_else(Catalogue::standard),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let dec = LayoutDecoderBuilder::new().build().unwrap();
        assert_eq!(dec.limits(), &Limits::default());
    }

    #[test]
    fn rejects_bad_limits() {
        assert_eq!(
            LayoutDecoderBuilder::new().list_count_cap(0).build().unwrap_err(),
            LayoutDecoderBuilderError::ZeroLimit("list_count_cap")
        );
        assert_eq!(
            LayoutDecoderBuilder::new()
                .display_string_limit(10)
                .separate_string_limit(5)
                .build()
                .unwrap_err(),
            LayoutDecoderBuilderError::StringLimitMismatch
        );
        assert_eq!(
            LayoutDecoderBuilder::new()
                .max_children(50)
                .max_sane_tree_count(10)
                .build()
                .unwrap_err(),
            LayoutDecoderBuilderError::CeilingBelowCap("max_sane_tree_count")
        );
    }
}
