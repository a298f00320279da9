//! A small, template-aware parser for C++ type names.
//!
//! The debugger hands out type names as strings such as
//! `eastl::map<int, eastl::basic_string<char, eastl::allocator> >`. Decoder
//! dispatch only needs three things from such a string: the namespace path of
//! the outermost type, its template arguments, and a canonical spelling that
//! can be used as a lookup key. Anything the parser does not understand simply
//! yields `None`, which callers treat as "no decoder available".

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

/// A single template argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateArg {
    /// A type argument, e.g. the `int` in `vector<int>`.
    Type(TypeName),
    /// An integral constant, e.g. the `4` in `array<int, 4>`.
    Value(i64),
}

/// One `::`-separated component of a qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// The identifier, without template arguments.
    pub name: String,
    /// Template arguments attached to this component.
    pub args: Vec<TemplateArg>,
}

/// A parsed, normalized type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    text: String,
    segments: Vec<Segment>,
}

/// Collapse whitespace and drop cv-qualifiers.
///
/// `"const eastl::vector<int, eastl::allocator >"` becomes
/// `"eastl::vector<int,eastl::allocator>"`. Spaces are only kept between
/// two identifier tokens, as in `unsigned int`.
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut word = String::new();
    let mut last_was_word = false;

    let flush = |word: &mut String, out: &mut String, last_was_word: &mut bool| {
        if word.is_empty() {
            return;
        }
        if word != "const" && word != "volatile" {
            if *last_was_word {
                out.push(' ');
            }
            out.push_str(word);
            *last_was_word = true;
        }
        word.clear();
    };

    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
        } else {
            flush(&mut word, &mut out, &mut last_was_word);
            if !c.is_whitespace() {
                out.push(c);
                last_was_word = false;
            }
        }
    }
    flush(&mut word, &mut out, &mut last_was_word);

    out
}

fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_end_matches(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let v: i64 = digits.parse().ok()?;
    Some(if neg { -v } else { v })
}

struct Parser<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.pos).copied()
    }

    fn at_scope(&self) -> bool {
        self.s[self.pos..].starts_with("::")
    }

    /// Read an identifier up to the next `<`, `::`, `,` or `>` outside of
    /// parentheses.
    fn ident(&mut self) -> &'a str {
        let s = self.s;
        let start = self.pos;
        let mut parens = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'(' => parens += 1,
                b')' => parens = parens.saturating_sub(1),
                b'<' | b',' | b'>' if parens == 0 => break,
                b':' if parens == 0 && self.at_scope() => break,
                _ => {}
            }
            self.pos += 1;
        }
        &s[start..self.pos]
    }

    fn type_name(&mut self) -> Option<TypeName> {
        let start = self.pos;
        let mut segments = Vec::new();

        loop {
            let name = self.ident();
            let mut args = Vec::new();

            if self.peek() == Some(b'<') {
                self.pos += 1;
                if self.peek() != Some(b'>') {
                    loop {
                        args.push(self.arg()?);
                        match self.peek() {
                            Some(b',') => self.pos += 1,
                            Some(b'>') => break,
                            _ => return None,
                        }
                    }
                }
                self.pos += 1;
            }

            let mut name = String::from(name);
            // pointer / reference declarators trail the last template argument
            while let Some(b @ (b'*' | b'&')) = self.peek() {
                name.push(b as char);
                self.pos += 1;
            }

            if name.is_empty() && args.is_empty() {
                return None;
            }
            segments.push(Segment { name, args });

            if self.at_scope() {
                self.pos += 2;
            } else {
                break;
            }
        }

        Some(TypeName {
            text: String::from(&self.s[start..self.pos]),
            segments,
        })
    }

    fn arg(&mut self) -> Option<TemplateArg> {
        let start = self.pos;
        let ty = self.type_name()?;
        if ty.segments.len() == 1 && ty.segments[0].args.is_empty() {
            if let Some(v) = parse_int(&self.s[start..self.pos]) {
                return Some(TemplateArg::Value(v));
            }
        }
        Some(TemplateArg::Type(ty))
    }
}

impl TypeName {
    /// Parse a C++ type name. Returns `None` if the name is malformed.
    pub fn parse(name: &str) -> Option<TypeName> {
        let norm = normalize(name);
        let mut p = Parser { s: &norm, pos: 0 };
        let ty = p.type_name()?;
        if p.pos != norm.len() {
            return None;
        }
        Some(ty)
    }

    /// The normalized spelling of the whole name.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// All `::`-separated components.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The name with all template arguments removed, e.g.
    /// `eastl::__debug::map` or `eastl::map::iterator`.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i != 0 {
                out.push_str("::");
            }
            out.push_str(&seg.name);
        }
        out
    }

    /// The innermost identifier.
    pub fn base(&self) -> &str {
        self.segments.last().map(|s| s.name.as_str()).unwrap_or("")
    }

    /// Whether `ns` appears as an enclosing namespace (or class) component.
    pub fn in_namespace(&self, ns: &str) -> bool {
        let n = self.segments.len();
        self.segments[..n.saturating_sub(1)]
            .iter()
            .any(|s| s.name == ns)
    }

    /// Template arguments of the innermost component that has any.
    ///
    /// For `map<K, V>::iterator` these are `K, V`.
    pub fn args(&self) -> &[TemplateArg] {
        self.segments
            .iter()
            .rev()
            .find(|s| !s.args.is_empty())
            .map(|s| s.args.as_slice())
            .unwrap_or(&[])
    }

    /// The `i`th template argument, if it is a type.
    pub fn arg_type(&self, i: usize) -> Option<&TypeName> {
        match self.args().get(i)? {
            TemplateArg::Type(t) => Some(t),
            TemplateArg::Value(_) => None,
        }
    }

    /// The `i`th template argument, if it is an integral constant.
    pub fn arg_value(&self, i: usize) -> Option<i64> {
        match self.args().get(i)? {
            TemplateArg::Value(v) => Some(*v),
            TemplateArg::Type(_) => None,
        }
    }

    /// The enclosing name, e.g. `eastl::map<int,int>` for
    /// `eastl::map<int,int>::iterator`.
    pub fn parent(&self) -> Option<TypeName> {
        if self.segments.len() < 2 {
            return None;
        }
        let segments = self.segments[..self.segments.len() - 1].to_vec();
        Some(TypeName {
            text: render(&segments),
            segments,
        })
    }
}

fn render(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        if i != 0 {
            out.push_str("::");
        }
        out.push_str(&seg.name);
        if seg.args.is_empty() {
            continue;
        }
        out.push('<');
        for (j, arg) in seg.args.iter().enumerate() {
            if j != 0 {
                out.push(',');
            }
            match arg {
                TemplateArg::Type(t) => out.push_str(t.as_str()),
                TemplateArg::Value(v) => {
                    let _ = write!(out, "{}", v);
                }
            }
        }
        out.push('>');
    }
    out
}

impl core::fmt::Display for TypeName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_whitespace_and_cv() {
        assert_eq!(
            normalize("const eastl::vector< int, eastl::allocator > "),
            "eastl::vector<int,eastl::allocator>"
        );
        assert_eq!(normalize("unsigned  long long"), "unsigned long long");
        assert_eq!(normalize("char const *"), "char*");
    }

    #[test]
    fn nested_template_args() {
        let t = TypeName::parse("eastl::map<int, eastl::basic_string<char, eastl::allocator> >")
            .unwrap();
        assert_eq!(t.canonical(), "eastl::map");
        assert_eq!(t.arg_type(0).unwrap().as_str(), "int");
        let s = t.arg_type(1).unwrap();
        assert_eq!(s.canonical(), "eastl::basic_string");
        assert_eq!(s.arg_type(0).unwrap().as_str(), "char");
    }

    #[test]
    fn integral_args() {
        let t = TypeName::parse("eastl::array<double, 16ul>").unwrap();
        assert_eq!(t.arg_value(1), Some(16));
        assert_eq!(t.arg_type(1), None);
    }

    #[test]
    fn nested_class_keeps_outer_args() {
        let t = TypeName::parse("eastl::map<int, float>::const_iterator").unwrap();
        assert_eq!(t.canonical(), "eastl::map::const_iterator");
        assert_eq!(t.base(), "const_iterator");
        assert_eq!(t.arg_type(1).unwrap().as_str(), "float");

        let parent = t.parent().unwrap();
        assert_eq!(parent.as_str(), "eastl::map<int,float>");
        assert_eq!(parent.canonical(), "eastl::map");
    }

    #[test]
    fn namespaces() {
        let t = TypeName::parse("eastl::__1::string").unwrap();
        assert!(t.in_namespace("__1"));
        assert!(!t.in_namespace("string"));
    }

    #[test]
    fn function_signatures_are_opaque() {
        let t = TypeName::parse("eastl::function<void (int, char)>").unwrap();
        assert_eq!(t.canonical(), "eastl::function");
        assert_eq!(t.arg_type(0).unwrap().as_str(), "void(int,char)");
    }

    #[test]
    fn pointers() {
        let t = TypeName::parse("eastl::vector<int *>").unwrap();
        assert_eq!(t.arg_type(0).unwrap().as_str(), "int*");
    }

    #[test]
    fn malformed() {
        assert!(TypeName::parse("eastl::vector<int").is_none());
        assert!(TypeName::parse("").is_none());
    }
}
