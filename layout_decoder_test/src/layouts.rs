//! Writers for EASTL container layouts on the fake heap. Each returns the
//! address of the container object.

use anyhow::Result;

use crate::FakeProcess;

impl FakeProcess {
    /// Allocate a `{length, capacity, refcount}` rep followed by `chars`,
    /// and return the data pointer.
    pub fn rep(&mut self, chars: &[u8], len: u64, refcount: u64) -> Result<u64> {
        let mut bytes = self.words(&[len, len, refcount]);
        bytes.extend_from_slice(chars);
        Ok(self.alloc(bytes)? + 3 * self.ptr())
    }

    pub fn string_rep(&mut self, text: &str) -> Result<u64> {
        self.rep(text.as_bytes(), text.len() as u64, 1)
    }

    pub fn wide_rep(&mut self, text: &str) -> Result<u64> {
        let units: Vec<u8> = match self.wchar_size()? {
            2 => text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect(),
            _ => text.chars().flat_map(|c| (c as u32).to_le_bytes()).collect(),
        };
        let len = units.len() as u64 / self.wchar_size()?;
        self.rep(&units, len, 1)
    }

    pub fn string(&mut self, text: &str) -> Result<u64> {
        let data = self.string_rep(text)?;
        self.alloc_words(&[data])
    }

    pub fn string_with_refcount(&mut self, text: &str, refcount: u64) -> Result<u64> {
        let data = self.rep(text.as_bytes(), text.len() as u64, refcount)?;
        self.alloc_words(&[data])
    }

    pub fn wstring(&mut self, text: &str) -> Result<u64> {
        let data = self.wide_rep(text)?;
        self.alloc_words(&[data])
    }

    /// A `__1::string`: inline while it fits in the object, external after.
    pub fn libcxx_string(&mut self, text: &str) -> Result<u64> {
        let object = 3 * self.ptr() as usize;
        if text.len() < object - 1 {
            let mut bytes = vec![(text.len() as u8) << 1];
            bytes.extend_from_slice(text.as_bytes());
            bytes.resize(object, 0);
            return self.alloc(bytes);
        }

        let len = text.len() as u64;
        let data = self.alloc(text.as_bytes().to_vec())?;
        self.alloc_words(&[(len + 16) | 1, len, data])
    }

    /// A `vector` over elements already packed into `data`.
    pub fn vector(&mut self, data: Vec<u8>) -> Result<u64> {
        let len = data.len() as u64;
        let begin = if len == 0 { 0 } else { self.alloc(data)? };
        self.alloc_words(&[begin, begin + len, begin + len])
    }

    pub fn vector_of_ints(&mut self, xs: &[i32]) -> Result<u64> {
        self.vector(xs.iter().flat_map(|x| x.to_le_bytes()).collect())
    }

    pub fn vector_of_strings(&mut self, xs: &[&str]) -> Result<u64> {
        let mut data = Vec::with_capacity(xs.len());
        for x in xs {
            data.push(self.string_rep(x)?);
        }
        let bytes = self.words(&data);
        self.vector(bytes)
    }

    /// A `list<long>` without a cached size.
    pub fn list_of_longs(&mut self, xs: &[i64]) -> Result<u64> {
        let head = self.alloc_words(&[0, 0])?;
        let mut nodes = Vec::with_capacity(xs.len());
        for &x in xs {
            nodes.push(self.alloc_words(&[0, 0, x as u64])?);
        }

        let p = self.ptr();
        for (i, &node) in nodes.iter().enumerate() {
            let next = nodes.get(i + 1).copied().unwrap_or(head);
            let prev = if i == 0 { head } else { nodes[i - 1] };
            self.write_word(node, next)?;
            self.write_word(node + p, prev)?;
        }
        self.write_word(head, nodes.first().copied().unwrap_or(head))?;
        self.write_word(head + p, nodes.last().copied().unwrap_or(head))?;
        Ok(head)
    }

    /// A `set<long>` holding `keys`, as a perfectly balanced tree.
    pub fn set_of_longs(&mut self, keys: &[i64]) -> Result<u64> {
        let mut keys = keys.to_vec();
        keys.sort_unstable();
        keys.dedup();

        let anchor = self.alloc_words(&[0, 0, 0, 0, keys.len() as u64])?;
        let mut nodes = Vec::with_capacity(keys.len());
        for &k in &keys {
            nodes.push(self.alloc_words(&[0, 0, 0, 0, k as u64])?);
        }
        let root = self.link_subtree(&nodes, anchor)?;

        let p = self.ptr();
        self.write_word(anchor, nodes.last().copied().unwrap_or(anchor))?;
        self.write_word(anchor + p, nodes.first().copied().unwrap_or(anchor))?;
        self.write_word(anchor + 2 * p, root)?;
        Ok(anchor)
    }

    /// Link sorted `nodes` into a subtree under `parent`; returns its root.
    fn link_subtree(&mut self, nodes: &[u64], parent: u64) -> Result<u64> {
        if nodes.is_empty() {
            return Ok(0);
        }
        let mid = nodes.len() / 2;
        let node = nodes[mid];
        let left = self.link_subtree(&nodes[..mid], node)?;
        let right = self.link_subtree(&nodes[mid + 1..], node)?;

        let p = self.ptr();
        self.write_word(node, right)?;
        self.write_word(node + p, left)?;
        self.write_word(node + 2 * p, parent)?;
        Ok(node)
    }

    /// A `hash_set<eastl::string>` spread over `bucket_count` buckets.
    pub fn hash_set_of_strings(&mut self, items: &[&str], bucket_count: u64) -> Result<u64> {
        let mut heads = vec![0u64; bucket_count as usize];
        for item in items {
            let data = self.string_rep(item)?;
            let b = (item.bytes().map(u64::from).sum::<u64>() % bucket_count) as usize;
            heads[b] = self.alloc_words(&[data, heads[b]])?;
        }
        // EASTL terminates the bucket array with a non-null sentinel
        heads.push(!0);

        let array = self.alloc_words(&heads)?;
        self.alloc_words(&[array, bucket_count, items.len() as u64, 0])
    }
}
