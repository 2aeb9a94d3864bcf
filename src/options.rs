use std::path::{Path, PathBuf};

use indexmap::IndexMap;

/// A single option value of a command line namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Flag switched off, emits nothing.
    Absent,
    /// Flag switched on, emits only its key.
    Present,
    /// Valued option, emits its key followed by the value.
    Scalar(String),
}

impl OptionValue {
    pub fn flag(on: bool) -> Self {
        if on {
            OptionValue::Present
        } else {
            OptionValue::Absent
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::flag(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Scalar(value.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Scalar(value)
    }
}

impl From<&Path> for OptionValue {
    fn from(value: &Path) -> Self {
        OptionValue::Scalar(value.display().to_string())
    }
}

impl From<PathBuf> for OptionValue {
    fn from(value: PathBuf) -> Self {
        OptionValue::from(value.as_path())
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for OptionValue {
                fn from(value: $ty) -> Self {
                    OptionValue::Scalar(value.to_string())
                }
            }
        )*
    };
}

impl_from_number!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

/// Ordered option namespace.
///
/// Keys keep the position of their first insertion, so merging a key again
/// only replaces its value and the argument order stays stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    inner: IndexMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow merge `options` into this namespace, later values win.
    pub fn set<K, V>(&mut self, options: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<OptionValue>,
    {
        options.into_iter().for_each(|(key, value)| {
            self.inner.insert(key.into(), value.into());
        });
        self
    }

    /// Merge a single option.
    pub fn set_one(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> &mut Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    /// Merge every entry of `other` into this namespace.
    pub fn merge(&mut self, other: &Options) -> &mut Self {
        self.set(other.iter().map(|(k, v)| (k.to_owned(), v.clone())))
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.inner.get(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convert to argument tokens in key order.
    pub fn to_args(&self) -> Vec<String> {
        self.inner
            .iter()
            .flat_map(|(key, value)| match value {
                OptionValue::Absent => vec![],
                OptionValue::Present => vec![key.to_owned()],
                OptionValue::Scalar(v) => vec![key.to_owned(), v.to_owned()],
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Options
where
    K: Into<String>,
    V: Into<OptionValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut options = Options::new();
        options.set(iter);
        options
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_merge_right_biased() {
        let mut options = Options::new();
        options.set([("-a", 1_usize)]).set([("-a", 2_usize)]);
        assert_eq!(options.get("-a"), Some(&OptionValue::Scalar("2".into())));
        assert_eq!(options.to_args(), vec!["-a", "2"]);
    }

    #[test]
    fn test_flag_suppressed() {
        let mut options = Options::new();
        options.set([("-u", true)]);
        assert_eq!(options.to_args(), vec!["-u"]);
        options.set([("-u", false)]);
        assert!(options.to_args().is_empty());
        assert_eq!(options.len(), 1);
    }

    #[test]
    fn test_order_stable_across_merges() {
        let mut options = Options::new();
        options
            .set_one("-np", 1_usize)
            .set_one("-map-by", "node")
            .set_one("-nooversubscribe", true);
        options.set_one("-np", 4_usize);
        assert_eq!(
            options.to_args(),
            vec!["-np", "4", "-map-by", "node", "-nooversubscribe"]
        );
    }

    #[test]
    fn test_merge_idempotent() {
        let patch: Options = [("-d", OptionValue::from("/tmp/")), ("-F", true.into())]
            .into_iter()
            .collect();
        let mut options = Options::new();
        options.merge(&patch);
        let once = options.clone();
        options.merge(&patch);
        assert_eq!(options, once);
        assert_eq!(options.to_args(), vec!["-d", "/tmp/", "-F"]);
    }
}
