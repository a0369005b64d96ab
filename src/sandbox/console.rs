#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{cell::RefCell, rc::Rc};

use rquickjs::{Ctx, Function};

/// Appended once output reaches its cap.
pub const TRUNCATION_NOTICE: &str = "...[output truncated]";

/// Script that builds `console` and `print` around a host write function.
/// Every call prints its arguments converted with `String` and joined with a
/// space, as one line.
const PRELUDE: &str = r#"
(function (write) {
    const format = (args) => Array.prototype.map.call(args, (arg) => String(arg)).join(" ");
    const log = function () { write(format(arguments)); };
    globalThis.console = { log, info: log, warn: log, error: log, debug: log, trace: log };
    globalThis.print = log;
})
"#;

/// Bounded, line-oriented capture buffer.
///
/// The cap counts line text and the newlines between lines. A line that
/// exactly fills the cap is kept whole; only its own newline goes past it.
#[derive(Debug)]
pub(crate) struct Buffer {
    /// captured text
    text:      String,
    /// byte cap
    limit:     usize,
    /// set once the cap is hit; later writes are dropped
    truncated: bool,
}

impl Buffer {
    /// Creates an empty buffer that keeps at most `limit` bytes.
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
            truncated: false,
        }
    }

    /// Appends `line` and a newline, truncating at the cap.
    pub(crate) fn write_line(&mut self, line: &str) {
        if self.truncated {
            return;
        }

        if self.text.len() + line.len() <= self.limit {
            self.text.push_str(line);
            self.text.push('\n');
            return;
        }

        let mut cut = self.limit.saturating_sub(self.text.len()).min(line.len());
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&line[..cut]);
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(TRUNCATION_NOTICE);
        self.truncated = true;
    }

    /// Whether output was cut at the cap.
    pub(crate) fn truncated(&self) -> bool {
        self.truncated
    }

    /// Returns everything captured so far.
    pub(crate) fn contents(&self) -> String {
        self.text.clone()
    }
}

/// Captured console output of one evaluation.
#[derive(Clone)]
pub(crate) struct Console {
    /// shared with the host write function
    buffer: Rc<RefCell<Buffer>>,
    /// also sees every line written before the cap is hit
    tee:    Option<Rc<dyn Fn(&str)>>,
}

impl Console {
    /// Creates an empty console that keeps at most `limit` bytes.
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            buffer: Rc::new(RefCell::new(Buffer::new(limit))),
            tee:    None,
        }
    }

    /// Forwards each line to `tee` as it is written, until the cap is hit.
    pub(crate) fn with_tee(mut self, tee: impl Fn(&str) + 'static) -> Self {
        self.tee = Some(Rc::new(tee));
        self
    }

    /// Installs `console` and `print` into the context's globals.
    pub(crate) fn install(&self, ctx: &Ctx<'_>) -> rquickjs::Result<()> {
        let buffer = Rc::clone(&self.buffer);
        let tee = self.tee.clone();
        let write = Function::new(ctx.clone(), move |line: String| {
            let mut buffer = buffer.borrow_mut();
            if let Some(tee) = tee.as_ref().filter(|_| !buffer.truncated()) {
                tee(&line);
            }
            buffer.write_line(&line);
        })?;

        let mut options = rquickjs::context::EvalOptions::default();
        options.strict = false;
        let setup: Function = ctx.eval_with_options(PRELUDE, options)?;
        setup.call::<_, ()>((write,))
    }

    /// Whether output was cut at the cap.
    pub(crate) fn truncated(&self) -> bool {
        self.buffer.borrow().truncated()
    }

    /// Returns everything captured so far.
    pub(crate) fn contents(&self) -> String {
        self.buffer.borrow().contents()
    }
}
