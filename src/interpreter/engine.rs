// Execution engine for snippets

use crate::deadline::CancelToken;
use crate::interpreter::compile::CompiledUnit;
use crate::interpreter::constants::{
    DEFAULT_RECURSION_LIMIT, MAX_RECURSION_LIMIT, MAX_STACK_USAGE, MODULE_FRAME,
};
use crate::interpreter::errors::{Exception, ExceptionKind, Interrupt, TraceFrame};
use crate::interpreter::{builtins, ops};
use crate::parser::ast::*;
use crate::runtime::namespace::{new_scope, Namespace, Scope};
use crate::runtime::value::Value;
use rustc_hash::FxHashSet;
use std::rc::Rc;

/// Pending non-local control flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlFlow {
    Normal,
    Break,
    Continue,
    Return,
}

/// One activation: module code, a function call or a comprehension
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) name: Rc<str>,
    pub(crate) locals: Scope,
    /// Scopes of enclosing functions, outermost first
    pub(crate) enclosing: Vec<Scope>,
    pub(crate) global_names: Rc<FxHashSet<String>>,
    /// Line currently executing in this frame
    pub(crate) line: usize,
    pub(crate) is_module: bool,
}

/// Tree-walking interpreter for one snippet invocation
pub struct Interpreter {
    namespace: Namespace,

    /// Module-level frame; its locals are the globals
    module: Frame,

    /// Active function and comprehension frames, innermost last
    calls: Vec<Frame>,

    pub(crate) control_flow: ControlFlow,

    /// Value of the last `return`
    pub(crate) return_value: Value,

    /// Exceptions being handled, innermost last; target of a bare `raise`
    pub(crate) handling: Vec<Rc<Exception>>,

    cancel: CancelToken,

    recursion_limit: usize,

    /// Stack position when `run` was entered; 0 until then
    stack_base: usize,
}

impl Interpreter {
    /// Create an interpreter over a fresh namespace, observing `cancel`
    pub fn new(cancel: CancelToken) -> Self {
        let namespace = Namespace::fresh();
        let module = Frame {
            name: Rc::from(MODULE_FRAME),
            locals: Rc::clone(&namespace.globals),
            enclosing: Vec::new(),
            global_names: Rc::default(),
            line: 1,
            is_module: true,
        };

        Interpreter {
            namespace,
            module,
            calls: Vec::new(),
            control_flow: ControlFlow::Normal,
            return_value: Value::None,
            handling: Vec::new(),
            cancel,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            stack_base: 0,
        }
    }

    /// Clamped to `1..=MAX_RECURSION_LIMIT`
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit.clamp(1, MAX_RECURSION_LIMIT);
        self
    }

    /// Run a compiled snippet to completion
    pub fn run(&mut self, unit: &CompiledUnit) -> Result<(), Interrupt> {
        tracing::trace!(
            statements = unit.program.body.len(),
            filename = %unit.filename,
            "interpreter started"
        );
        self.stack_base = stack_position();
        self.execute_block(&unit.program.body)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Take the captured tail-expression value, if any
    pub fn take_result(&mut self) -> Option<Value> {
        self.namespace.result.take()
    }

    /// Look up a global binding
    pub fn global(&self, name: &str) -> Option<Value> {
        self.namespace.globals.borrow().get(name).cloned()
    }

    /// Line being executed by the innermost frame
    pub fn current_line(&self) -> usize {
        self.frame().line
    }

    pub(crate) fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Abort with a timeout if the deadline has fired
    #[inline]
    pub(crate) fn checkpoint(&self) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            return Err(self.timeout());
        }
        Ok(())
    }

    /// Raise `RecursionError` before deep evaluation exhausts the native stack
    #[inline]
    pub(crate) fn check_stack(&self) -> Result<(), Exception> {
        if self.stack_base != 0 && self.stack_base.abs_diff(stack_position()) > MAX_STACK_USAGE {
            tracing::debug!(limit = MAX_STACK_USAGE, "native stack budget exhausted");
            return Err(Exception::new(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }
        Ok(())
    }

    pub(crate) fn timeout(&self) -> Interrupt {
        Interrupt::Timeout {
            traceback: self.traceback(),
        }
    }

    /// The current frame stack, outermost first
    pub(crate) fn traceback(&self) -> Vec<TraceFrame> {
        std::iter::once(&self.module)
            .chain(self.calls.iter())
            .map(|frame| TraceFrame {
                name: frame.name.to_string(),
                line: frame.line,
            })
            .collect()
    }

    /// Attach the current frame stack to an exception that has none yet
    pub(crate) fn locate(&self, interrupt: Interrupt) -> Interrupt {
        match interrupt {
            Interrupt::Raise(mut exception) if exception.traceback.is_empty() => {
                exception.traceback = self.traceback();
                Interrupt::Raise(exception)
            }
            other => other,
        }
    }

    pub(crate) fn frame(&self) -> &Frame {
        self.calls.last().unwrap_or(&self.module)
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.calls.last_mut().unwrap_or(&mut self.module)
    }

    pub(crate) fn set_line(&mut self, line: usize) {
        self.frame_mut().line = line;
    }

    pub(crate) fn call_depth(&self) -> usize {
        self.calls.len()
    }

    pub(crate) fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) {
        self.calls.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) {
        self.calls.pop();
    }

    /// A comprehension scope nested in the current frame
    pub(crate) fn nested_frame(&self, name: &str) -> Frame {
        let parent = self.frame();
        let mut enclosing = parent.enclosing.clone();
        if !parent.is_module {
            enclosing.push(Rc::clone(&parent.locals));
        }
        Frame {
            name: Rc::from(name),
            locals: new_scope(),
            enclosing,
            global_names: Rc::default(),
            line: parent.line,
            is_module: false,
        }
    }

    /// Scopes a function defined here closes over
    pub(crate) fn closure_scopes(&self) -> Vec<Scope> {
        let frame = self.frame();
        if frame.is_module {
            return Vec::new();
        }
        let mut scopes = frame.enclosing.clone();
        scopes.push(Rc::clone(&frame.locals));
        scopes
    }

    /// Resolve a name: locals, enclosing functions, globals, then built-ins
    pub(crate) fn lookup_name(&self, name: &str) -> Result<Value, Exception> {
        let frame = self.frame();
        if !frame.is_module && !frame.global_names.contains(name) {
            if let Some(value) = frame.locals.borrow().get(name) {
                return Ok(value.clone());
            }
            for scope in frame.enclosing.iter().rev() {
                if let Some(value) = scope.borrow().get(name) {
                    return Ok(value.clone());
                }
            }
        }

        if let Some(value) = self.namespace.globals.borrow().get(name) {
            return Ok(value.clone());
        }

        builtins::lookup(name).ok_or_else(|| {
            Exception::new(
                ExceptionKind::NameError,
                format!("name '{}' is not defined", name),
            )
        })
    }

    pub(crate) fn store_name(&mut self, name: &str, value: Value) {
        let frame = self.frame();
        let scope = if frame.global_names.contains(name) {
            &self.namespace.globals
        } else {
            &frame.locals
        };
        scope.borrow_mut().insert(name.to_string(), value);
    }

    pub(crate) fn delete_name(&mut self, name: &str) -> Result<(), Exception> {
        let frame = self.frame();
        let scope = if frame.global_names.contains(name) {
            &self.namespace.globals
        } else {
            &frame.locals
        };
        match scope.borrow_mut().remove(name) {
            Some(_) => Ok(()),
            None => Err(Exception::new(
                ExceptionKind::NameError,
                format!("name '{}' is not defined", name),
            )),
        }
    }

    pub(crate) fn store_result(&mut self, value: Value) {
        self.namespace.result.store(value);
    }

    /// Execute statements until one of them changes control flow
    pub(crate) fn execute_block(&mut self, body: &[Stmt]) -> Result<(), Interrupt> {
        for stmt in body {
            self.execute_statement(stmt)?;
            if self.control_flow != ControlFlow::Normal {
                break;
            }
        }
        Ok(())
    }

    /// Execute a single statement
    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> Result<(), Interrupt> {
        self.set_line(stmt.location.line);
        self.checkpoint()?;

        let result = match &stmt.kind {
            StmtKind::Expr(expr) => self.evaluate_expr(expr).map(drop),
            StmtKind::Assign { targets, value } => self.execute_assignment(targets, value),
            StmtKind::AugAssign { target, op, value } => {
                self.execute_aug_assignment(target, *op, value)
            }
            StmtKind::If {
                condition,
                body,
                orelse,
            } => self.execute_if(condition, body, orelse),
            StmtKind::While {
                condition,
                body,
                orelse,
            } => self.execute_while(condition, body, orelse),
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => self.execute_for(target, iter, body, orelse),
            StmtKind::FunctionDef(def) => self.execute_function_def(def),
            StmtKind::Return(value) => self.execute_return(value.as_ref()),
            StmtKind::Break => {
                self.control_flow = ControlFlow::Break;
                Ok(())
            }
            StmtKind::Continue => {
                self.control_flow = ControlFlow::Continue;
                Ok(())
            }
            StmtKind::Pass | StmtKind::Global(_) => Ok(()),
            StmtKind::Raise(value) => self.execute_raise(value.as_ref()),
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => self.execute_try(body, handlers, orelse, finalbody),
            StmtKind::Assert { test, message } => self.execute_assert(test, message.as_ref()),
            StmtKind::Delete(targets) => targets
                .iter()
                .try_for_each(|target| self.delete_target(target)),
            StmtKind::Import(aliases) => self.execute_import(aliases),
            StmtKind::ImportFrom { module, names } => self.execute_import_from(module, names),
        };

        result.map_err(|interrupt| self.locate(interrupt))
    }

    /// Evaluate an expression to a value
    pub(crate) fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value, Interrupt> {
        self.check_stack()?;
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Float(f) => Ok(Value::Float(*f)),
            ExprKind::Str(s) => Ok(Value::from(s.as_str())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::NoneLiteral => Ok(Value::None),
            ExprKind::FString(parts) => self.evaluate_fstring(parts),
            ExprKind::Name(name) => Ok(self.lookup_name(name)?),
            ExprKind::ResultSlot => Err(Exception::new(
                ExceptionKind::RuntimeError,
                "the result slot cannot be read",
            )
            .into()),
            ExprKind::List(items) => Ok(Value::list(self.evaluate_all(items)?)),
            ExprKind::Tuple(items) => Ok(Value::tuple(self.evaluate_all(items)?)),
            ExprKind::Dict(pairs) => self.evaluate_dict(pairs),
            ExprKind::BinaryOp { op, left, right } => {
                let left = self.evaluate_expr(left)?;
                let right = self.evaluate_expr(right)?;
                Ok(ops::binary::binary_op(*op, &left, &right)?)
            }
            ExprKind::UnaryOp { op, operand } => {
                let operand = self.evaluate_expr(operand)?;
                Ok(ops::unary::unary_op(*op, &operand)?)
            }
            ExprKind::BoolOp { op, left, right } => self.evaluate_bool_op(*op, left, right),
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => self.evaluate_compare(left, ops, comparators),
            ExprKind::IfExp {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    self.evaluate_expr(then_expr)
                } else {
                    self.evaluate_expr(else_expr)
                }
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => self.evaluate_call(func, args, keywords, expr.location),
            ExprKind::Attribute { object, name } => {
                let object = self.evaluate_expr(object)?;
                Ok(ops::access::get_attribute(&object, name)?)
            }
            ExprKind::Subscript { object, index } => self.evaluate_subscript(object, index),
            ExprKind::Slice { .. } => Err(Exception::new(
                ExceptionKind::TypeError,
                "slice expressions are only valid inside subscripts",
            )
            .into()),
            ExprKind::Lambda(def) => self.make_function(def),
            ExprKind::ListComp {
                element,
                generators,
            } => self.evaluate_list_comp(element, generators),
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => self.evaluate_dict_comp(key, value, generators),
        }
    }

    pub(crate) fn evaluate_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, Interrupt> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.evaluate_expr(expr)?);
        }
        Ok(values)
    }
}

/// Address of a local in a fresh frame, standing in for the stack pointer
#[inline(never)]
fn stack_position() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::compile::compile;
    use crate::parser::parse_snippet;

    fn run(source: &str) -> (Interpreter, Result<(), Interrupt>) {
        let unit = compile(parse_snippet(source).unwrap(), "<snippet>").unwrap();
        let mut interpreter = Interpreter::new(CancelToken::new());
        let result = interpreter.run(&unit);
        (interpreter, result)
    }

    fn global_int(interpreter: &Interpreter, name: &str) -> i64 {
        match interpreter.global(name) {
            Some(Value::Int(n)) => n,
            other => panic!("{} is {:?}", name, other),
        }
    }

    #[test]
    fn test_assignment_and_arithmetic() {
        let (interp, result) = run("x = 5\ny = x * 2 + 1\n");
        assert!(result.is_ok());
        assert_eq!(global_int(&interp, "y"), 11);
    }

    #[test]
    fn test_function_scopes() {
        let (interp, result) = run(
            "total = 10\ndef add(a, b=2):\n    local = a + b\n    return local + total\nr = add(1)\n",
        );
        assert!(result.is_ok());
        assert_eq!(global_int(&interp, "r"), 13);
        assert!(interp.global("local").is_none());
    }

    #[test]
    fn test_closures_see_enclosing_scope() {
        let (interp, result) = run(
            "def outer(n):\n    def inner(m):\n        return n * m\n    return inner\nr = outer(3)(4)\n",
        );
        assert!(result.is_ok());
        assert_eq!(global_int(&interp, "r"), 12);
    }

    #[test]
    fn test_global_declaration() {
        let (interp, result) = run("count = 0\ndef bump():\n    global count\n    count += 1\nbump()\nbump()\n");
        assert!(result.is_ok());
        assert_eq!(global_int(&interp, "count"), 2);
    }

    #[test]
    fn test_traceback_lines() {
        let (_, result) = run("def f(x):\n    return 10 / x\n\ny = f(0)\n");
        match result {
            Err(Interrupt::Raise(exception)) => {
                assert_eq!(exception.kind, ExceptionKind::ZeroDivisionError);
                assert_eq!(
                    exception.traceback,
                    vec![
                        TraceFrame { name: "<module>".to_string(), line: 4 },
                        TraceFrame { name: "f".to_string(), line: 2 },
                    ]
                );
            }
            other => panic!("expected ZeroDivisionError, got {:?}", other),
        }
    }

    #[test]
    fn test_undefined_name() {
        let (_, result) = run("x = 1\nprint(y)\n");
        match result {
            Err(Interrupt::Raise(exception)) => {
                assert_eq!(exception.summary(), "NameError: name 'y' is not defined");
                assert_eq!(exception.line(), Some(2));
            }
            other => panic!("expected NameError, got {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_token_interrupts() {
        let unit = compile(parse_snippet("while True:\n    pass\n").unwrap(), "<snippet>").unwrap();
        let token = CancelToken::new();
        token.cancel();
        let mut interpreter = Interpreter::new(token);
        let result = interpreter.run(&unit);
        assert!(matches!(result, Err(Interrupt::Timeout { .. })));
    }

    #[test]
    fn test_recursion_limit() {
        let unit = compile(
            parse_snippet("def f(n):\n    return f(n + 1)\nf(0)\n").unwrap(),
            "<snippet>",
        )
        .unwrap();
        let mut interpreter = Interpreter::new(CancelToken::new()).with_recursion_limit(20);
        match interpreter.run(&unit) {
            Err(Interrupt::Raise(exception)) => {
                assert_eq!(exception.kind, ExceptionKind::RecursionError);
                assert_eq!(exception.traceback.len(), 21);
            }
            other => panic!("expected RecursionError, got {:?}", other),
        }
    }

    #[test]
    fn test_recursion_limit_is_clamped() {
        let interpreter = Interpreter::new(CancelToken::new()).with_recursion_limit(100_000);
        assert_eq!(interpreter.recursion_limit(), MAX_RECURSION_LIMIT);
        let interpreter = Interpreter::new(CancelToken::new()).with_recursion_limit(0);
        assert_eq!(interpreter.recursion_limit(), 1);
    }

    #[test]
    fn test_unbounded_recursion_stops_before_stack_exhaustion() {
        // Nested calls through builtins use more stack per level than plain calls
        let source = "def f(n):\n    return max([f(n + 1)], key=lambda v: v)\nf(0)\n";
        let unit = compile(parse_snippet(source).unwrap(), "<snippet>").unwrap();
        let mut interpreter =
            Interpreter::new(CancelToken::new()).with_recursion_limit(MAX_RECURSION_LIMIT);
        match interpreter.run(&unit) {
            Err(Interrupt::Raise(exception)) => {
                assert_eq!(exception.kind, ExceptionKind::RecursionError);
            }
            other => panic!("expected RecursionError, got {:?}", other),
        }
    }

    #[test]
    fn test_long_elif_chain_runs_last_branch() {
        let mut source = String::from("x = 200
if x == 0:
    r = 0
");
        for i in 1..=200 {
            source.push_str(&format!("elif x == {}:
    r = {}
", i, i * 2));
        }
        let (interp, result) = run(&source);
        assert!(result.is_ok());
        assert_eq!(global_int(&interp, "r"), 400);
    }
}
