//! The table of recognized container layouts.
//!
//! Each entry maps a canonical type name (namespace path without template
//! arguments) to a [`LayoutDescriptor`]. ABI-variant namespaces such as
//! `__debug::`, `__cxx1998::`, `__cxx11::`, `__1::` and `experimental::` are
//! aliases: they are dropped from the name before the lookup, so
//! `eastl::__debug::vector` finds the `eastl::vector` entry. Whether the
//! memory layout itself differs is decided later, by
//! [`AbiVariant::select`](crate::abi::AbiVariant::select).

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::format::{DisplayFormat, ARRAY_FORMATS, MAP_FORMATS, STRING_FORMATS, WSTRING_FORMATS};
use crate::typename::TypeName;

/// Namespace components that only select an ABI variant.
const ALIAS_NAMESPACES: &[&str] = &["__debug", "__cxx1998", "__cxx11", "__1", "experimental"];

/// The family of decoder to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContainerKind {
    /// `vector` / `VectorBase`
    Vector,
    /// `array<T, N>`
    Array,
    /// `valarray`
    Valarray,
    /// `deque` / `DequeBase`
    Deque,
    /// `list`
    List,
    /// `map`, `multimap`, `set`, `multiset`
    Tree,
    /// Iterators into a balanced tree.
    TreeIterator,
    /// `hashtable` and the unordered / hash containers built on it.
    HashTable,
    /// `unordered_set`, `unordered_multiset`
    UnorderedSet,
    /// `string`, `wstring`, `basic_string`
    String,
    /// `shared_ptr`, `weak_ptr`, `unique_ptr`
    SmartPtr,
    /// `optional`
    Optional,
    /// `pair`
    Pair,
    /// `complex`
    Complex,
    /// `function`
    Function,
    /// `stack` (decodes its underlying container)
    Stack,
    /// Debug-mode iterator wrapper (decodes the wrapped iterator)
    SafeIterator,
    /// `once_flag`
    OnceFlag,
}

/// Where a container finds the type of its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementArgs {
    /// The type has no element type.
    None,
    /// Template argument 0.
    First,
    /// Template argument 1 (e.g. `hashtable<Key, Value, ...>`).
    Second,
    /// Arguments 0 and 1 form a key/mapped pair.
    KeyValue,
    /// The element type of the enclosing container, for nested iterator types.
    Parent,
    /// Argument 0, three levels deep (`_Tree_iterator<_Tree_val<_Tree_simple_types<T>>>`).
    Innermost,
}

bitflags::bitflags! {
    /// Per-descriptor properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DescriptorFlags: u8 {
        /// The value can be replaced through [`LayoutDecoder::edit`](crate::LayoutDecoder::edit).
        const EDITABLE = 1 << 0;
        /// Elements are key/value pairs.
        const KEYED = 1 << 1;
        /// Characters are `wchar_t`.
        const WIDE = 1 << 2;
    }
}

/// Registration-time facts about one container layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutDescriptor {
    /// Which decoder handles the layout.
    pub kind: ContainerKind,
    /// Display formats offered to the user, besides `Automatic`.
    pub formats: &'static [DisplayFormat],
    /// Extra properties.
    pub flags: DescriptorFlags,
    /// How to find the element type.
    pub element: ElementArgs,
}

impl LayoutDescriptor {
    fn new(kind: ContainerKind, element: ElementArgs) -> LayoutDescriptor {
        LayoutDescriptor {
            kind,
            formats: &[],
            flags: DescriptorFlags::empty(),
            element,
        }
    }

    fn formats(mut self, formats: &'static [DisplayFormat]) -> LayoutDescriptor {
        self.formats = formats;
        self
    }

    fn flags(mut self, flags: DescriptorFlags) -> LayoutDescriptor {
        self.flags = flags;
        self
    }
}

/// Canonical name -> descriptor table.
#[derive(Debug, Clone)]
pub struct Catalogue {
    entries: BTreeMap<String, LayoutDescriptor>,
}

/// The lookup key for `name`: its canonical spelling with ABI alias
/// namespaces removed.
pub fn lookup_key(name: &TypeName) -> String {
    let segments = name.segments();
    let last = segments.len().saturating_sub(1);
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        if i != last && ALIAS_NAMESPACES.contains(&seg.name.as_str()) {
            continue;
        }
        if !out.is_empty() {
            out.push_str("::");
        }
        out.push_str(&seg.name);
    }
    out
}

impl Catalogue {
    /// An empty catalogue.
    pub fn empty() -> Catalogue {
        Catalogue {
            entries: BTreeMap::new(),
        }
    }

    /// The catalogue of every built-in EASTL layout.
    pub fn standard() -> Catalogue {
        use self::ContainerKind as K;
        use self::DescriptorFlags as F;
        use self::ElementArgs as E;

        let mut cat = Catalogue::empty();

        let vector = LayoutDescriptor::new(K::Vector, E::First).formats(ARRAY_FORMATS);
        cat.register_all(&["eastl::vector", "eastl::VectorBase"], vector);
        cat.register(
            "eastl::array",
            LayoutDescriptor::new(K::Array, E::First).formats(ARRAY_FORMATS),
        );
        cat.register(
            "eastl::valarray",
            LayoutDescriptor::new(K::Valarray, E::First).formats(ARRAY_FORMATS),
        );
        cat.register_all(
            &["eastl::deque", "eastl::DequeBase"],
            LayoutDescriptor::new(K::Deque, E::First),
        );
        cat.register("eastl::list", LayoutDescriptor::new(K::List, E::First));

        let map = LayoutDescriptor::new(K::Tree, E::KeyValue)
            .formats(MAP_FORMATS)
            .flags(F::KEYED);
        cat.register_all(&["eastl::map", "eastl::multimap"], map);
        let set = LayoutDescriptor::new(K::Tree, E::First);
        cat.register_all(&["eastl::set", "eastl::multiset"], set);

        let nested_iter = LayoutDescriptor::new(K::TreeIterator, E::Parent);
        for tree in &["map", "multimap", "set", "multiset"] {
            for iter in &["iterator", "const_iterator"] {
                cat.register(&alloc::format!("eastl::{}::{}", tree, iter), nested_iter);
            }
        }
        cat.register_all(
            &[
                "eastl::rbtree_iterator",
                "eastl::_Rb_tree_iterator",
                "eastl::_Rb_tree_const_iterator",
            ],
            LayoutDescriptor::new(K::TreeIterator, E::First),
        );
        cat.register_all(
            &["eastl::_Tree_iterator", "eastl::_Tree_const_iterator"],
            LayoutDescriptor::new(K::TreeIterator, E::Innermost),
        );

        cat.register(
            "eastl::hashtable",
            LayoutDescriptor::new(K::HashTable, E::Second).formats(MAP_FORMATS),
        );
        let hash_map = LayoutDescriptor::new(K::HashTable, E::KeyValue)
            .formats(MAP_FORMATS)
            .flags(F::KEYED);
        cat.register_all(
            &[
                "eastl::hash_map",
                "eastl::hash_multimap",
                "eastl::unordered_map",
                "eastl::unordered_multimap",
            ],
            hash_map,
        );
        cat.register_all(
            &["eastl::hash_set", "eastl::hash_multiset"],
            LayoutDescriptor::new(K::HashTable, E::First),
        );
        cat.register_all(
            &["eastl::unordered_set", "eastl::unordered_multiset"],
            LayoutDescriptor::new(K::UnorderedSet, E::First),
        );

        let string = LayoutDescriptor::new(K::String, E::None)
            .formats(STRING_FORMATS)
            .flags(F::EDITABLE);
        cat.register_all(&["eastl::string", "string"], string);
        let wstring = LayoutDescriptor::new(K::String, E::None)
            .formats(WSTRING_FORMATS)
            .flags(F::EDITABLE | F::WIDE);
        cat.register_all(&["eastl::wstring", "wstring"], wstring);
        cat.register(
            "eastl::basic_string",
            LayoutDescriptor::new(K::String, E::First).formats(STRING_FORMATS),
        );

        cat.register_all(
            &[
                "eastl::shared_ptr",
                "eastl::weak_ptr",
                "eastl::__weak_ptr",
                "eastl::unique_ptr",
            ],
            LayoutDescriptor::new(K::SmartPtr, E::First),
        );
        cat.register("eastl::optional", LayoutDescriptor::new(K::Optional, E::First));
        cat.register("eastl::pair", LayoutDescriptor::new(K::Pair, E::KeyValue));
        cat.register("eastl::complex", LayoutDescriptor::new(K::Complex, E::First));
        cat.register("eastl::function", LayoutDescriptor::new(K::Function, E::None));
        cat.register("eastl::stack", LayoutDescriptor::new(K::Stack, E::First));
        cat.register(
            "__gnu_debug::_Safe_iterator",
            LayoutDescriptor::new(K::SafeIterator, E::First),
        );
        cat.register("eastl::once_flag", LayoutDescriptor::new(K::OnceFlag, E::None));

        cat
    }

    /// Add (or replace) the descriptor for `canonical`.
    pub fn register(&mut self, canonical: &str, descriptor: LayoutDescriptor) {
        self.entries.insert(String::from(canonical), descriptor);
    }

    fn register_all(&mut self, names: &[&str], descriptor: LayoutDescriptor) {
        for name in names {
            self.register(name, descriptor);
        }
    }

    /// Find the descriptor for a parsed type name.
    pub fn lookup(&self, name: &TypeName) -> Option<&LayoutDescriptor> {
        self.entries.get(&lookup_key(name))
    }

    /// Parse `name` and find its descriptor.
    pub fn lookup_str(&self, name: &str) -> Option<&LayoutDescriptor> {
        self.lookup(&TypeName::parse(name)?)
    }

    /// Number of registered canonical names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
