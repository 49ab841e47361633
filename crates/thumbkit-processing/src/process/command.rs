use bytes::Bytes;

/// One invocation of an external binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Bytes piped to the child's stdin; stdin is closed when `None`
    pub stdin: Option<Bytes>,
    /// Short name used in logs and error messages (e.g. "ffmpeg-seek")
    pub label: String,
    /// The command writes its result to files, so empty stdout is not a failure
    pub allow_empty_stdout: bool,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            label: label.into(),
            allow_empty_stdout: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, data: Bytes) -> Self {
        self.stdin = Some(data);
        self
    }

    pub fn allow_empty_stdout(mut self) -> Self {
        self.allow_empty_stdout = true;
        self
    }

    /// Command line for logs, without stdin
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
