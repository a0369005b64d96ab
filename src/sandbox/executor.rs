#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    cell::{Cell, RefCell},
    ffi::{CStr, CString},
    hash::{DefaultHasher, Hash, Hasher},
    rc::Rc,
    time::Instant,
};

use rquickjs::{
    CatchResultExt, CaughtError, Coerced, Context, Ctx, Error, Exception, FromJs, Runtime, Value,
    context::EvalOptions, qjs,
};

use super::{
    cancel::CancelHandle,
    console::Console,
    result::{ErrorKind, ExecutionError, ExecutionResult},
};
use crate::config::SandboxLimits;

/// Name scripts are compiled under. Shows up in stack traces.
const SCRIPT_NAME: &CStr = c"eval_script";

/// Promise rejections no handler has claimed yet, keyed by promise identity,
/// oldest first.
type Rejections = Rc<RefCell<Vec<(u64, String)>>>;

/// Where an exception surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// while parsing the script
    Compile,
    /// while running the script or its promise jobs
    Run,
}

/// Runs `code` in a brand new QuickJS runtime bounded by `limits`.
///
/// The runtime, its context and every global the script creates are dropped
/// before this returns.
pub(crate) fn evaluate(
    code: &str,
    limits: &SandboxLimits,
    cancel: &CancelHandle,
) -> ExecutionResult {
    evaluate_with(code, limits, cancel, Console::new(limits.max_output_bytes()))
}

/// Like [`evaluate`], capturing output into `console`.
pub(crate) fn evaluate_with(
    code: &str,
    limits: &SandboxLimits,
    cancel: &CancelHandle,
    console: Console,
) -> ExecutionResult {
    let started = Instant::now();
    let deadline = started + limits.timeout();
    let tripped: Rc<Cell<Option<ErrorKind>>> = Rc::new(Cell::new(None));
    let rejections: Rejections = Rc::default();

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => return host_error(&console, format!("could not create runtime: {e}")),
    };
    runtime.set_memory_limit(limits.memory_limit_bytes());
    runtime.set_max_stack_size(limits.max_stack_bytes());
    runtime.set_interrupt_handler(Some(interrupt_handler(
        deadline,
        cancel.clone(),
        Rc::clone(&tripped),
    )));
    runtime.set_host_promise_rejection_tracker(Some(rejection_tracker(Rc::clone(&rejections))));

    let context = match Context::full(&runtime) {
        Ok(context) => context,
        Err(e) => return host_error(&console, format!("could not create context: {e}")),
    };

    let outcome = context
        .with(|ctx| run_script(&ctx, code, &console))
        .and_then(|value| drain_jobs(&runtime, deadline, &tripped).map(|()| value))
        .and_then(|value| match unhandled_rejection(&rejections) {
            Some(error) => Err(error),
            None => Ok(value),
        });

    let outcome = match tripped.get() {
        Some(ErrorKind::Timeout) => Err(ExecutionError::timed_out(limits.timeout())),
        Some(ErrorKind::Cancelled) => Err(ExecutionError::cancelled()),
        _ => outcome,
    };

    if console.truncated() {
        tracing::debug!("Console output truncated at {} bytes", limits.max_output_bytes());
    }

    let result = match outcome {
        Ok(value) => ExecutionResult::succeeded(console.contents(), value),
        Err(error) => ExecutionResult::failed(console.contents(), error),
    };
    tracing::debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        success = result.success(),
        "Sandbox run finished"
    );
    result
}

/// Builds the interrupt hook. It stops the script once `cancel` fires or the
/// deadline passes, recording which one happened in `tripped`.
fn interrupt_handler(
    deadline: Instant,
    cancel: CancelHandle,
    tripped: Rc<Cell<Option<ErrorKind>>>,
) -> Box<dyn FnMut() -> bool + 'static> {
    Box::new(move || {
        if tripped.get().is_some() {
            return true;
        }
        if cancel.is_cancelled() {
            tripped.set(Some(ErrorKind::Cancelled));
            true
        } else if Instant::now() >= deadline {
            tripped.set(Some(ErrorKind::Timeout));
            true
        } else {
            false
        }
    })
}

/// Builds the promise rejection hook. The engine reports a rejection with no
/// handler, then reports the same promise again if a handler is attached
/// later.
fn rejection_tracker(
    pending: Rejections,
) -> Box<dyn for<'a> Fn(Ctx<'a>, Value<'a>, Value<'a>, bool) + 'static> {
    Box::new(move |ctx, promise, reason, is_handled| {
        let key = identity(&promise);
        if is_handled {
            let mut pending = pending.borrow_mut();
            if let Some(at) = pending.iter().rposition(|(k, _)| *k == key) {
                pending.remove(at);
            }
        } else {
            let message = describe_rejection(&ctx, &reason);
            pending.borrow_mut().push((key, message));
        }
    })
}

/// Identity of a JavaScript object, stable while it is alive.
fn identity(value: &Value<'_>) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// The oldest rejection nothing handled, if any.
fn unhandled_rejection(pending: &Rejections) -> Option<ExecutionError> {
    pending
        .borrow()
        .first()
        .map(|(_, message)| ExecutionError::new(ErrorKind::RuntimeError, message.clone()))
}

/// Installs the console, checks that `code` parses, then evaluates it as a
/// sloppy-mode global script and converts its completion value.
fn run_script(
    ctx: &Ctx<'_>,
    code: &str,
    console: &Console,
) -> Result<Option<serde_json::Value>, ExecutionError> {
    console
        .install(ctx)
        .catch(ctx)
        .map_err(|e| {
            ExecutionError::new(ErrorKind::HostError, format!("console setup failed: {e}"))
        })?;

    compile(ctx, code)?;

    let mut options = EvalOptions::default();
    options.strict = false;

    match ctx.eval_with_options::<Value, _>(code, options).catch(ctx) {
        Ok(value) => Ok(completion_value(ctx, value)),
        Err(caught) => Err(classify(caught, Phase::Run)),
    }
}

/// Parses `code` as a sloppy-mode global script without running it.
fn compile(ctx: &Ctx<'_>, code: &str) -> Result<(), ExecutionError> {
    let source = CString::new(code).map_err(|_| {
        ExecutionError::new(ErrorKind::CompileError, "source contains a NUL character")
    })?;
    let flags = (qjs::JS_EVAL_TYPE_GLOBAL | qjs::JS_EVAL_FLAG_COMPILE_ONLY) as i32;

    // SAFETY: `ctx` is locked for the duration of this call, and `JS_Eval`
    // returns an owned value that `Value` frees on drop.
    let compiled = unsafe {
        let raw = qjs::JS_Eval(
            ctx.as_raw().as_ptr(),
            source.as_ptr(),
            code.len() as _,
            SCRIPT_NAME.as_ptr(),
            flags,
        );
        Value::from_raw(ctx.clone(), raw)
    };

    if compiled.is_exception() {
        return Err(classify(
            CaughtError::from_error(ctx, Error::Exception),
            Phase::Compile,
        ));
    }
    Ok(())
}

/// Runs queued promise jobs until none are left, the deadline passes, or a
/// job fails.
fn drain_jobs(
    runtime: &Runtime,
    deadline: Instant,
    tripped: &Rc<Cell<Option<ErrorKind>>>,
) -> Result<(), ExecutionError> {
    loop {
        if tripped.get().is_some() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            tripped.set(Some(ErrorKind::Timeout));
            return Ok(());
        }

        match runtime.execute_pending_job() {
            Ok(true) => continue,
            Ok(false) => return Ok(()),
            Err(job) => {
                return Err(job.0.with(|ctx| {
                    classify(CaughtError::from_error(&ctx, Error::Exception), Phase::Run)
                }));
            }
        }
    }
}

/// Reads an error object's `name`, defaulting to `Error`.
fn error_name(ctx: &Ctx<'_>, exception: &Exception<'_>) -> String {
    exception
        .as_object()
        .get::<_, String>("name")
        .unwrap_or_else(|_| {
            let _ = ctx.catch();
            "Error".to_string()
        })
}

/// Renders a thrown or rejected value that is not an error object.
fn describe_value<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> String {
    match Coerced::<String>::from_js(ctx, value.clone()) {
        Ok(text) => text.0,
        Err(_) => {
            let _ = ctx.catch();
            "<unprintable value>".to_string()
        }
    }
}

/// Describes why an unhandled promise was rejected.
fn describe_rejection<'js>(ctx: &Ctx<'js>, reason: &Value<'js>) -> String {
    match reason.as_exception() {
        Some(exception) => format!(
            "Uncaught (in promise) {}: {}",
            error_name(ctx, exception),
            exception.message().unwrap_or_default()
        ),
        None => format!("Uncaught (in promise) {}", describe_value(ctx, reason)),
    }
}

/// Maps a caught engine error onto the sandbox error taxonomy. Only a
/// `SyntaxError` raised while parsing is a compile error; anything thrown
/// once the script is running is a runtime error.
fn classify(caught: CaughtError<'_>, phase: Phase) -> ExecutionError {
    match caught {
        CaughtError::Exception(exception) => {
            let ctx = exception.ctx().clone();
            let name = error_name(&ctx, &exception);
            let message = exception.message().unwrap_or_default();
            let kind = match phase {
                Phase::Compile if name == "SyntaxError" => ErrorKind::CompileError,
                _ => ErrorKind::RuntimeError,
            };
            let location = exception.stack().and_then(|stack| {
                stack
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .map(str::to_string)
            });

            match location {
                Some(at) => ExecutionError::new(kind, format!("{name}: {message} ({at})")),
                None => ExecutionError::new(kind, format!("{name}: {message}")),
            }
        }
        CaughtError::Value(value) => {
            let text = describe_value(value.ctx(), &value);
            ExecutionError::new(ErrorKind::RuntimeError, format!("Uncaught {text}"))
        }
        CaughtError::Error(Error::Allocation) => {
            ExecutionError::new(ErrorKind::RuntimeError, "out of memory")
        }
        CaughtError::Error(e @ Error::InvalidString(_)) => {
            ExecutionError::new(ErrorKind::CompileError, e.to_string())
        }
        CaughtError::Error(e) => {
            tracing::warn!("Sandbox engine error: {e}");
            ExecutionError::new(ErrorKind::HostError, e.to_string())
        }
    }
}

/// Converts a completion value to JSON, or `None` when it is `undefined` or
/// has no JSON form.
fn completion_value<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Option<serde_json::Value> {
    if value.is_undefined() {
        return None;
    }

    match ctx.json_stringify(value) {
        Ok(Some(json)) => serde_json::from_str(&json.to_string().ok()?).ok(),
        Ok(None) => None,
        Err(_) => {
            // clear the pending exception left by a throwing toJSON or a cycle
            let _ = ctx.catch();
            None
        }
    }
}

/// A host failure, keeping any output captured so far.
fn host_error(console: &Console, message: String) -> ExecutionResult {
    tracing::warn!("Sandbox unavailable: {message}");
    ExecutionResult::failed(
        console.contents(),
        ExecutionError::new(ErrorKind::HostError, message),
    )
}
