use bytes::Bytes;

/// A decoded client command.
///
/// Holds the command name and every raw argument, including the name
/// itself at index 0 and, by convention, the target key at index 1.
/// Immutable once built; `arg_count` always equals `args.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCommand {
    name: String,
    arg_count: usize,
    args: Vec<Bytes>,
}

impl RequestCommand {
    /// Builds a command from its raw arguments.
    ///
    /// Returns `None` for an empty argument list. The name is the first
    /// argument, upper-cased.
    pub fn from_args(args: Vec<Bytes>) -> Option<Self> {
        let name = String::from_utf8_lossy(args.first()?).to_ascii_uppercase();
        Some(Self {
            name,
            arg_count: args.len(),
            args,
        })
    }

    /// Convenience constructor from string parts.
    ///
    /// # Example
    /// ```
    /// use kvbridge::protocol::RequestCommand;
    /// let cmd = RequestCommand::from_parts(["zcount", "myset", "1", "2"]).unwrap();
    /// assert_eq!(cmd.name(), "ZCOUNT");
    /// assert_eq!(cmd.arg_count(), 4);
    /// ```
    pub fn from_parts<I, S>(parts: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        Self::from_args(
            parts
                .into_iter()
                .map(|p| Bytes::copy_from_slice(p.as_ref()))
                .collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arg_count(&self) -> usize {
        self.arg_count
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Bytes> {
        self.args.get(index)
    }

    /// The argument at `index` as UTF-8 text, if present and valid.
    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.arg(index).and_then(|b| std::str::from_utf8(b).ok())
    }

    /// The target key (argument 1), or an empty slice if missing.
    pub fn key(&self) -> &[u8] {
        self.arg(1).map_or(&[][..], |b| &b[..])
    }
}
