//! Executes parsed recipes against a DSL instance.
//!
//! Every statement names either a builder operation (`set`, `set_default`,
//! `append`, `task`, `invoke`, `use`, `log`, `fetch`) or a hook declared on
//! the definition. A hook statement with a `do ... end` block registers the
//! block on the chain; a hook statement followed by `.call(...)` dispatches
//! it. A statement that is just a bare name evaluates that name.
//!
//! Blocks capture the locals visible where they are written (block
//! parameters and the helper `options`) by value, so a task or hook body
//! defined inside a helper keeps seeing that helper's options after the
//! helper returns.

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{info, trace, warn};

use super::definition::BUILDER_OPERATIONS;
use super::hooks::{HookFilter, Placement};
use super::{Callback, Dsl, Value};
use crate::core::MamiyaError;
use crate::recipe::{Block, Call, Expr, Program, Statement, StrPart};
use crate::utils::find_similar_name;

/// Local bindings of a running block or helper.
pub type Locals = HashMap<String, Value>;

/// Source file display name and the line the parsed text starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub file: String,
    pub first_line: usize,
}

impl Origin {
    pub fn new(file: impl Into<String>, first_line: usize) -> Self {
        Self {
            file: file.into(),
            first_line: first_line.max(1),
        }
    }

    /// `file:line` for a 1-based line of the parsed text.
    pub fn location(&self, line: usize) -> String {
        format!("{}:{}", self.file, self.first_line.saturating_add(line.saturating_sub(1)))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.first_line)
    }
}

/// A recipe `do ... end` block with the locals it closed over.
#[derive(Debug, Clone)]
pub struct ScriptBlock {
    block: Arc<Block>,
    captured: Arc<Locals>,
    origin: Arc<Origin>,
    line: usize,
}

impl ScriptBlock {
    /// `file:line` where the block was written.
    pub fn origin(&self) -> String {
        self.origin.location(self.line)
    }

    /// Run the block body. Missing arguments bind `nil`, extra ones are dropped.
    pub fn call(&self, dsl: &Dsl, args: &[Value]) -> Result<Value> {
        let mut locals = (*self.captured).clone();
        for (index, param) in self.block.params.iter().enumerate() {
            locals.insert(param.clone(), args.get(index).cloned().unwrap_or_default());
        }

        let frame = Frame {
            dsl,
            origin: Arc::clone(&self.origin),
            locals,
        };
        frame.run(&self.block.body)
    }
}

/// Run a whole program with the given initial locals, returning the value of
/// the last statement.
pub(crate) fn execute(dsl: &Dsl, program: &Program, origin: Origin, locals: Locals) -> Result<Value> {
    let frame = Frame {
        dsl,
        origin: Arc::new(origin),
        locals,
    };
    frame.run(&program.statements)
}

struct Frame<'a> {
    dsl: &'a Dsl,
    origin: Arc<Origin>,
    locals: Locals,
}

impl Frame<'_> {
    fn run(&self, statements: &[Statement]) -> Result<Value> {
        let mut last = Value::Nil;
        for statement in statements {
            last = self.exec(statement)?;
        }
        Ok(last)
    }

    fn exec(&self, statement: &Statement) -> Result<Value> {
        let call = &statement.call;
        let line = statement.line;
        trace!(location = %self.origin.location(line), operation = %call.name, "executing statement");

        if !BUILDER_OPERATIONS.contains(&call.name.as_str()) {
            if self.dsl.definition.has_hook(&call.name) {
                return self.exec_hook(call, line);
            }
            return self.exec_bare(call, line);
        }

        if call.call_args.is_some() {
            return Err(self.invalid(call, line, "'.call' only applies to hook dispatchers"));
        }
        if call.block.is_some() && call.name != "task" {
            return Err(self.invalid(call, line, "does not take a block"));
        }
        if !call.keywords.is_empty() && call.name != "use" {
            return Err(self.invalid(call, line, "does not take keyword arguments"));
        }

        match call.name.as_str() {
            "set" => {
                let [key, value] = self.args_exact::<2>(call, line)?;
                let key = self.key(call, line, &key)?;
                self.dsl.set(&key, value.clone());
                Ok(value)
            }
            "set_default" => {
                let [key, value] = self.args_exact::<2>(call, line)?;
                let key = self.key(call, line, &key)?;
                Ok(self.dsl.set_default(&key, value))
            }
            "append" => {
                let [key, value] = self.args_exact::<2>(call, line)?;
                let key = self.key(call, line, &key)?;
                self.dsl.append(&key, value).map_err(|err| self.relocate(err, line))?;
                Ok(self.dsl.get(&key).unwrap_or_default())
            }
            "task" => {
                let [name] = self.args_exact::<1>(call, line)?;
                let name = self.key(call, line, &name)?;
                let Some(block) = &call.block else {
                    return Err(self.invalid(call, line, "requires a do ... end block"));
                };
                self.dsl.task(&name, Callback::Script(self.capture(block, line)));
                Ok(Value::Nil)
            }
            "invoke" => {
                let [name] = self.args_exact::<1>(call, line)?;
                let name = self.key(call, line, &name)?;
                self.dsl.invoke(&name)?;
                Ok(Value::Nil)
            }
            "use" => self.exec_use(call, line),
            "log" => {
                let parts = self.args(&call.args, line)?;
                let message = parts.iter().map(Value::to_string).collect::<Vec<_>>().join(" ");
                info!(target: "mamiya::recipe", location = %self.origin.location(line), "{message}");
                Ok(Value::Nil)
            }
            "fetch" => self.fetch(call, line, &call.args),
            other => Err(self.unknown_operation(other, line)),
        }
    }

    fn exec_use(&self, call: &Call, line: usize) -> Result<Value> {
        let mut args = self.args(&call.args, line)?;
        let mut options = match args.len() {
            1 => BTreeMap::new(),
            2 => match args.pop() {
                Some(Value::Map(map)) => map,
                Some(other) => {
                    return Err(self.invalid(call, line, &format!("options must be a map, got a {}", other.type_name())));
                }
                None => BTreeMap::new(),
            },
            n => return Err(self.invalid(call, line, &format!("expects a helper name and options, got {n} arguments"))),
        };
        options.extend(self.keywords(&call.keywords, line)?);

        let name = self.key(call, line, &args[0])?;
        self.dsl.use_helper(&name, Value::Map(options))?;
        Ok(Value::Nil)
    }

    fn exec_hook(&self, call: &Call, line: usize) -> Result<Value> {
        let hook = call.name.as_str();
        let mut positional = self.args(&call.args, line)?;
        let mut options = self.keywords(&call.keywords, line)?;

        if let Some(block) = &call.block {
            if call.call_args.is_some() {
                return Err(self.invalid(call, line, "cannot both register a block and dispatch"));
            }
            if matches!(positional.last(), Some(Value::Map(_))) {
                if let Some(Value::Map(trailing)) = positional.pop() {
                    for (key, value) in trailing {
                        options.entry(key).or_insert(value);
                    }
                }
            }

            let placement = Placement::from_selector(positional.first());
            let filter = HookFilter::from_options(hook, &options)?;
            self.dsl.register_hook(hook, Callback::Script(self.capture(block, line)), filter, placement)?;
            return Ok(Value::Nil);
        }

        if !options.is_empty() {
            return Err(self.invalid(call, line, "dispatch takes selector labels, not keyword arguments"));
        }

        let dispatcher = self.dsl.dispatcher(hook, &positional)?;
        match &call.call_args {
            Some(args) => {
                let args = self.args(args, line)?;
                Ok(Value::List(dispatcher.call(&args)?))
            }
            None => {
                warn!(
                    location = %self.origin.location(line),
                    hook,
                    "hook dispatcher created but never called; add .call(...) to run it"
                );
                Ok(Value::Nil)
            }
        }
    }

    fn exec_bare(&self, call: &Call, line: usize) -> Result<Value> {
        let bare = call.args.is_empty() && call.keywords.is_empty() && call.call_args.is_none() && call.block.is_none();
        if bare {
            return self.lookup(&call.name, line);
        }
        Err(self.unknown_operation(&call.name, line))
    }

    fn capture(&self, block: &Arc<Block>, line: usize) -> ScriptBlock {
        ScriptBlock {
            block: Arc::clone(block),
            captured: Arc::new(self.locals.clone()),
            origin: Arc::clone(&self.origin),
            line,
        }
    }

    fn eval(&self, expr: &Expr, line: usize) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Interpolated(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        StrPart::Text(t) => text.push_str(t),
                        StrPart::Expr(e) => text.push_str(&self.eval(e, line)?.to_string()),
                    }
                }
                Ok(Value::String(text))
            }
            Expr::List(items) => Ok(Value::List(self.args(items, line)?)),
            Expr::Map(entries) => Ok(Value::Map(self.keywords(entries, line)?)),
            Expr::Ident(name) => self.lookup(name, line),
            Expr::Index(target, key) => {
                let target = self.eval(target, line)?;
                let key = self.eval(key, line)?;
                target.index(&key).ok_or_else(|| {
                    MamiyaError::InvalidArgument {
                        operation: "[]".to_string(),
                        location: self.origin.location(line),
                        reason: format!("cannot index a {} with a {}", target.type_name(), key.type_name()),
                    }
                    .into()
                })
            }
            Expr::Call {
                name,
                args,
            } if name == "fetch" => self.fetch(&Call::bare(name.as_str()), line, args),
            Expr::Call {
                name, ..
            } => Err(self.unknown_operation(name, line)),
        }
    }

    /// `fetch(key)` or `fetch(key, fallback)`; unknown keys give the fallback or `nil`.
    fn fetch(&self, call: &Call, line: usize, args: &[Expr]) -> Result<Value> {
        let mut values = self.args(args, line)?;
        if values.is_empty() || values.len() > 2 {
            return Err(self.invalid(call, line, "expects a key and an optional fallback"));
        }
        let fallback = if values.len() == 2 { values.pop().unwrap_or_default() } else { Value::Nil };
        let key = self.key(call, line, &values[0])?;
        Ok(self.dsl.get(&key).unwrap_or(fallback))
    }

    fn lookup(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }
        if self.dsl.definition.has_accessor(name) {
            return Ok(self.dsl.get(name).unwrap_or_default());
        }
        Err(MamiyaError::UndefinedName {
            name: name.to_string(),
            location: self.origin.location(line),
        }
        .into())
    }

    fn args(&self, exprs: &[Expr], line: usize) -> Result<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e, line)).collect()
    }

    fn keywords(&self, entries: &[(String, Expr)], line: usize) -> Result<BTreeMap<String, Value>> {
        entries.iter().map(|(k, e)| Ok((k.clone(), self.eval(e, line)?))).collect()
    }

    fn args_exact<const N: usize>(&self, call: &Call, line: usize) -> Result<[Value; N]> {
        let values = self.args(&call.args, line)?;
        let got = values.len();
        values.try_into().map_err(|_| self.invalid(call, line, &format!("expects {N} argument(s), got {got}")))
    }

    fn key(&self, call: &Call, line: usize, value: &Value) -> Result<String> {
        value
            .as_key()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(call, line, &format!("expects a name, got a {}", value.type_name())))
    }

    fn invalid(&self, call: &Call, line: usize, reason: &str) -> anyhow::Error {
        MamiyaError::InvalidArgument {
            operation: call.name.clone(),
            location: self.origin.location(line),
            reason: reason.to_string(),
        }
        .into()
    }

    fn relocate(&self, err: MamiyaError, line: usize) -> anyhow::Error {
        match err {
            MamiyaError::InvalidArgument {
                operation,
                reason,
                ..
            } => MamiyaError::InvalidArgument {
                operation,
                location: self.origin.location(line),
                reason,
            }
            .into(),
            other => other.into(),
        }
    }

    fn unknown_operation(&self, name: &str, line: usize) -> anyhow::Error {
        let hooks = self.dsl.definition.hook_names();
        let candidates = BUILDER_OPERATIONS.iter().copied().chain(hooks.iter().map(String::as_str));
        MamiyaError::UnknownOperation {
            name: name.to_string(),
            location: self.origin.location(line),
            did_you_mean: find_similar_name(name, candidates),
        }
        .into()
    }
}
