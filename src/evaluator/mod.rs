//! # Evaluator
//!
//! Recursive traversal of the statement tree against an environment
//! chain. Control flow (`return`, `break`, `continue`) travels through
//! reserved in-band sentinels instead of unwinding mechanisms: the
//! statement that fires writes the sentinel into the current frame,
//! every statement loop checks for one after each step, block exits
//! re-raise a pending sentinel into the enclosing frame, and the loop,
//! call, and run boundaries absorb what belongs to them.
//!
//! Three caps bound every run: recursion depth, per-loop iterations, and
//! container sizes.

mod operator;

use std::rc::Rc;

use crate::config::Config;
use crate::environment::{
    Alias, EnvRef, Environment, ScopeKind, BREAK_NAME, CONTINUE_NAME, RESULT_NAME, RETURN_NAME,
};
use crate::error::{Error, Location};
use crate::lexer::{Token, TokenKind};
use crate::parser::ast::{BlockKind, Callee, Loop, Statement};
use crate::standard;
use crate::value::{FunctionKind, FunctionValue, Value};

pub struct Evaluator {
    config: Config,
    depth: usize,
}

impl Evaluator {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            depth: 0,
        }
    }

    /// Evaluate top-level statements in a fresh root frame. The result is
    /// the returned value if the program returned, else the result-value,
    /// else the implicit `_` variable, else the frame's public projection.
    pub fn run(&mut self, statements: &[Statement]) -> Result<Value, Error> {
        let root = Environment::new(ScopeKind::Root);
        self.run_with_env(statements, &root)
    }

    pub fn run_with_env(&mut self, statements: &[Statement], env: &EnvRef) -> Result<Value, Error> {
        for statement in statements {
            self.evaluate(statement, env)?;
            if flow_pending(env) {
                break;
            }
        }

        let mut frame = env.borrow_mut();
        if let Some(payload) = unwrap_return(frame.take_local(RETURN_NAME)) {
            return Ok(payload);
        }
        if let Some(result) = frame.get_local(RESULT_NAME) {
            return Ok(result);
        }
        if let Some(implicit) = frame.get_local("_") {
            return Ok(implicit);
        }
        Ok(frame.projection())
    }

    /// Single dispatch point; every recursion passes through the depth
    /// guard here.
    pub fn evaluate(&mut self, statement: &Statement, env: &EnvRef) -> Result<Value, Error> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            self.depth -= 1;
            return Err(Error::evaluate(
                format!("evaluation depth exceeds the limit {}", self.config.max_depth),
                statement.location(),
            ));
        }

        let result = self.dispatch(statement, env);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, statement: &Statement, env: &EnvRef) -> Result<Value, Error> {
        match statement {
            Statement::Literal { token } => self.literal_value(token),
            Statement::Identifier { token } => self.lookup_identifier(token, env),
            Statement::Keyword { token } => {
                let name = match token.kind {
                    TokenKind::Break => BREAK_NAME,
                    _ => CONTINUE_NAME,
                };
                env.borrow_mut().define(name, Value::Bool(true));
                Ok(Value::Null)
            }
            Statement::Blank { .. } => Ok(Value::Null),
            Statement::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right, env),
            Statement::Array { values } => {
                let mut out = Vec::new();
                for value in values {
                    if matches!(value, Statement::Blank { .. }) {
                        continue;
                    }
                    out.push(self.evaluate(value, env)?);
                }
                if out.len() > self.config.max_array_size {
                    return Err(Error::evaluate(
                        format!(
                            "size of array or object exceeds the limit {}",
                            self.config.max_array_size
                        ),
                        statement.location(),
                    ));
                }
                Ok(Value::Array(out))
            }
            Statement::Block { values, kind } => self.evaluate_block(values, *kind, env),
            Statement::Callee(callee) => self.evaluate_callee(callee, env),
            Statement::Call { name, arguments } => {
                self.evaluate_call(statement, name, arguments, env)
            }
            Statement::Loop(lowered) => self.evaluate_loop(lowered, env),
            Statement::Get { members } => self.evaluate_get_members(members, env),
            Statement::Set {
                members,
                operator,
                value,
            } => self.evaluate_set(members, operator, value, env),
            Statement::Remove { token, members } => self.evaluate_remove(token, members, env),
            Statement::Return { value, .. } => {
                let payload = match value {
                    Some(value) => Some(self.evaluate(value, env)?),
                    None => None,
                };
                set_return(env, payload);
                Ok(Value::Null)
            }
            Statement::Injection {
                variable, value, ..
            } => {
                env.borrow_mut().define(variable, value.clone());
                Ok(Value::Null)
            }
            Statement::Value { value, .. } => Ok(value.clone()),
        }
    }

    /// The lexeme is parsed here, once per evaluation of the literal.
    fn literal_value(&self, token: &Token) -> Result<Value, Error> {
        match token.kind {
            TokenKind::Number => {
                let lexeme = &token.lexeme;
                if lexeme.contains(['.', 'e', 'E']) {
                    lexeme.parse::<f64>().map(Value::Float)
                } else {
                    lexeme
                        .parse::<i64>()
                        .map(Value::Int)
                        .or_else(|_| lexeme.parse::<f64>().map(Value::Float))
                }
                .map_err(|_| {
                    Error::evaluate(
                        format!("cannot parse the number '{lexeme}'"),
                        token.location.clone(),
                    )
                })
            }
            TokenKind::String => Ok(Value::Str(token.lexeme.clone())),
            TokenKind::True => Ok(Value::Bool(true)),
            TokenKind::False => Ok(Value::Bool(false)),
            TokenKind::Null => Ok(Value::Null),
            // the configured Infinity/NaN spellings stay identifiers
            TokenKind::Identifier => {
                if self.config.infinity.as_deref() == Some(token.lexeme.as_str()) {
                    Ok(Value::Float(f64::INFINITY))
                } else if self.config.nan.as_deref() == Some(token.lexeme.as_str()) {
                    Ok(Value::Float(f64::NAN))
                } else {
                    Err(Error::evaluate(
                        format!("cannot evaluate '{}'", token.lexeme),
                        token.location.clone(),
                    ))
                }
            }
            _ => Err(Error::evaluate(
                format!("cannot evaluate '{}'", token.lexeme),
                token.location.clone(),
            )),
        }
    }

    fn lookup_identifier(&mut self, token: &Token, env: &EnvRef) -> Result<Value, Error> {
        let name = &token.lexeme;

        let alias = env.borrow().find_alias(name);
        if let Some(alias) = alias {
            return self.evaluate_get_members(&alias.members, &alias.environment);
        }

        if let Some(value) = env.borrow().get(name) {
            return Ok(value);
        }

        if let Some(builtin) = standard::lookup(name) {
            return Ok(Value::Function(FunctionValue {
                kind: FunctionKind::Builtin(builtin),
                environment: None,
                is_reference: false,
            }));
        }

        Err(Error::evaluate(
            format!("'{name}' is undefined"),
            token.location.clone(),
        ))
    }

    fn evaluate_binary(
        &mut self,
        left: &Statement,
        operator: &Token,
        right: &Statement,
        env: &EnvRef,
    ) -> Result<Value, Error> {
        match operator.kind {
            TokenKind::Or => {
                if self.evaluate(left, env)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.evaluate(right, env)?.is_truthy()))
            }
            TokenKind::And => {
                if !self.evaluate(left, env)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.evaluate(right, env)?.is_truthy()))
            }
            TokenKind::Not => Ok(Value::Bool(!self.evaluate(right, env)?.is_truthy())),
            TokenKind::In => {
                let l = self.evaluate(left, env)?;
                if let Statement::Literal { token } = right {
                    if token.kind == TokenKind::Dot {
                        return operator::any_member(l, operator.location.clone());
                    }
                }
                let r = self.evaluate(right, env)?;
                operator::membership(l, r, operator.location.clone())
            }
            _ => {
                let l = self.evaluate(left, env)?;
                let r = self.evaluate(right, env)?;
                operator::apply(operator, l, r, &self.config, operator.location.clone())
            }
        }
    }

    /// `pure` and `anonymous` blocks open their own frame and evaluate to
    /// the frame's public projection (or the returned value). `limited`
    /// bodies run in the enclosing frame, so their assignments merge into
    /// it.
    fn evaluate_block(
        &mut self,
        values: &[Statement],
        kind: BlockKind,
        env: &EnvRef,
    ) -> Result<Value, Error> {
        if kind == BlockKind::Limited {
            for value in values {
                self.evaluate(value, env)?;
                if flow_pending(env) {
                    break;
                }
            }
            return Ok(Value::Null);
        }

        let child = Environment::with_enclosing(env, ScopeKind::Block);

        for value in values {
            self.evaluate(value, &child)?;
            if flow_pending(&child) {
                break;
            }
        }

        let result = {
            let frame = child.borrow();
            match frame.get_local(RETURN_NAME) {
                Some(Value::Array(items)) if !items.is_empty() => items[0].clone(),
                _ => frame.projection(),
            }
        };

        // a pending sentinel belongs to some enclosing loop or function
        let mut frame = child.borrow_mut();
        for name in [RETURN_NAME, BREAK_NAME, CONTINUE_NAME] {
            if let Some(sentinel) = frame.take_local(name) {
                env.borrow_mut().define(name, sentinel);
            }
        }

        Ok(result)
    }

    /// A definition captures its frame only when that frame belongs to a
    /// function invocation; that reference is what makes the value a
    /// closure.
    fn evaluate_callee(&mut self, callee: &Rc<Callee>, env: &EnvRef) -> Result<Value, Error> {
        let captured = match env.borrow().kind() {
            ScopeKind::Function => Some(Rc::clone(env)),
            _ => None,
        };
        let is_reference = callee
            .name
            .modifier
            .as_ref()
            .is_some_and(|modifier| modifier.kind == TokenKind::Reference);

        let value = Value::Function(FunctionValue {
            kind: FunctionKind::Script(Rc::clone(callee)),
            environment: captured,
            is_reference,
        });

        env.borrow_mut()
            .assign(&callee.name.name.lexeme, value.clone());
        Ok(value)
    }

    fn evaluate_call(
        &mut self,
        statement: &Statement,
        name: &Statement,
        arguments: &[Statement],
        env: &EnvRef,
    ) -> Result<Value, Error> {
        if let Statement::Identifier { token } = name {
            match token.kind {
                TokenKind::If => return self.evaluate_if(arguments, env),
                TokenKind::For => return self.evaluate_for(statement, arguments, env),
                _ => {}
            }
        }

        let callee_value = match name {
            Statement::Identifier { token } => self.lookup_identifier(token, env)?,
            other => self.evaluate(other, env)?,
        };

        let Value::Function(function) = callee_value else {
            return Err(Error::evaluate(
                format!("'{name}' is not a function"),
                name.location(),
            ));
        };

        match &function.kind {
            FunctionKind::Builtin(builtin) => {
                let mut values = vec![];
                for argument in arguments {
                    if matches!(argument, Statement::Blank { .. }) {
                        continue;
                    }
                    values.push(self.evaluate(argument, env)?);
                }
                standard::call(builtin, &values, &self.config, name.location())
            }
            FunctionKind::Script(callee) => self.call_script(
                &Rc::clone(callee),
                function.environment.clone(),
                arguments,
                env,
            ),
        }
    }

    /// Invoke a scripted function: open a frame whose parent is the
    /// captured environment (or the call site), bind parameters, run the
    /// body, and absorb control-flow sentinels at this boundary.
    fn call_script(
        &mut self,
        callee: &Rc<Callee>,
        captured: Option<EnvRef>,
        arguments: &[Statement],
        env: &EnvRef,
    ) -> Result<Value, Error> {
        let parent = captured.unwrap_or_else(|| Rc::clone(env));
        let frame = Environment::with_enclosing(&parent, ScopeKind::Function);

        let arguments: Vec<&Statement> = arguments
            .iter()
            .filter(|argument| !matches!(argument, Statement::Blank { .. }))
            .collect();

        for (i, parameter) in callee.parameters.iter().enumerate() {
            let parameter_name = &parameter.name.lexeme;
            let modifier = parameter.modifier.as_ref().map(|token| token.kind);

            match modifier {
                Some(TokenKind::Reference) => {
                    let Some(argument) = arguments.get(i) else {
                        return Err(Error::evaluate(
                            format!("missing argument for reference parameter '{parameter_name}'"),
                            parameter.name.location.clone(),
                        ));
                    };
                    let members = match argument {
                        Statement::Get { members } => members.clone(),
                        Statement::Identifier { .. } => vec![(*argument).clone()],
                        _ => {
                            return Err(Error::evaluate(
                                format!(
                                    "reference parameter '{parameter_name}' needs a variable"
                                ),
                                argument.location(),
                            ));
                        }
                    };
                    frame.borrow_mut().define_alias(
                        parameter_name,
                        Alias {
                            members,
                            environment: Rc::clone(env),
                        },
                    );
                }
                Some(TokenKind::Function) => {
                    let value = match arguments.get(i) {
                        Some(argument) => self.evaluate(argument, env)?,
                        None => Value::Null,
                    };
                    let Value::Function(function) = value else {
                        return Err(Error::evaluate(
                            format!("parameter '{parameter_name}' needs a function"),
                            parameter.name.location.clone(),
                        ));
                    };
                    frame
                        .borrow_mut()
                        .define(parameter_name, Value::Function(function.as_reference()));
                }
                _ => {
                    let value = match arguments.get(i) {
                        Some(argument) => self.evaluate(argument, env)?,
                        None => Value::Null,
                    };
                    frame.borrow_mut().define(parameter_name, value);
                }
            }
        }

        let Statement::Block { values, .. } = &callee.body else {
            return Err(Error::evaluate(
                format!("'{}' has no body", callee.name.name.lexeme),
                callee.name.name.location.clone(),
            ));
        };

        for value in values {
            self.evaluate(value, &frame)?;
            if flow_pending(&frame) {
                break;
            }
        }

        let mut frame = frame.borrow_mut();
        frame.take_local(BREAK_NAME);
        frame.take_local(CONTINUE_NAME);

        if let Some(payload) = unwrap_return(frame.take_local(RETURN_NAME)) {
            return Ok(payload);
        }
        Ok(frame.get_local(RESULT_NAME).unwrap_or(Value::Null))
    }

    /// Lowered `if`: arguments are condition/block pairs; the first truthy
    /// condition picks its block. `else` arrived as a final `true` pair.
    fn evaluate_if(&mut self, arguments: &[Statement], env: &EnvRef) -> Result<Value, Error> {
        for pair in arguments.chunks(2) {
            let [condition, block] = pair else {
                return Err(Error::evaluate(
                    "'if' without a block",
                    pair.first().and_then(Statement::location),
                ));
            };
            if self.evaluate(condition, env)?.is_truthy() {
                return self.evaluate(block, env);
            }
        }
        Ok(Value::Null)
    }

    /// Lower a `for` call into the executable `Loop` form.
    fn evaluate_for(
        &mut self,
        statement: &Statement,
        arguments: &[Statement],
        env: &EnvRef,
    ) -> Result<Value, Error> {
        let Some((body, heads)) = arguments.split_last() else {
            return Err(Error::evaluate("'for' without a body", statement.location()));
        };
        let Statement::Block { values, .. } = body else {
            return Err(Error::evaluate("'for' without a body", statement.location()));
        };

        let mut lowered = Loop {
            call: statement.clone(),
            initial: vec![],
            continuous: vec![],
            statements: values.clone(),
            each: None,
            iterator: None,
        };

        match heads {
            [] => {}
            [head] => {
                let mut in_form = false;
                if let Statement::Binary {
                    left,
                    operator,
                    right,
                } = head
                {
                    if operator.kind == TokenKind::In {
                        let Statement::Identifier { token } = left.as_ref() else {
                            return Err(Error::evaluate(
                                "'for (x in ...)' needs a variable",
                                left.location(),
                            ));
                        };
                        lowered.each = Some(token.clone());
                        lowered.iterator = Some((**right).clone());
                        in_form = true;
                    }
                }
                if !in_form {
                    lowered.continuous.push(head.clone());
                }
            }
            [initial, condition, update] => {
                lowered.initial.push(initial.clone());
                lowered.continuous.push(condition.clone());
                lowered.continuous.push(update.clone());
            }
            _ => {
                return Err(Error::evaluate(
                    "'for' accepts no, one, or three clauses",
                    statement.location(),
                ));
            }
        }

        self.evaluate(&Statement::Loop(Box::new(lowered)), env)
    }

    /// Run a lowered loop in the current frame. The guard is the first
    /// `continuous` statement, updates follow it; `continue` skips the
    /// rest of the body but not the updates.
    fn evaluate_loop(&mut self, lowered: &Loop, env: &EnvRef) -> Result<Value, Error> {
        for statement in &lowered.initial {
            self.evaluate(statement, env)?;
        }

        let items = match &lowered.iterator {
            Some(iterator) => {
                let value = self.evaluate(iterator, env)?;
                Some(match value {
                    Value::Array(values) => values,
                    Value::Object(members) => members
                        .keys()
                        .map(|key| Value::Str(key.clone()))
                        .collect(),
                    v => {
                        return Err(Error::evaluate(
                            format!("cannot iterate over {}", v.type_name()),
                            iterator.location(),
                        ));
                    }
                })
            }
            None => None,
        };

        let mut cursor = 0;
        let mut iterations = 0;

        loop {
            if let (Some(items), Some(each)) = (&items, &lowered.each) {
                if cursor >= items.len() {
                    break;
                }
                env.borrow_mut().define(&each.lexeme, items[cursor].clone());
                cursor += 1;
            } else if let Some(guard) = lowered.continuous.first() {
                let keep_going = match guard {
                    Statement::Blank { .. } => true,
                    _ => self.evaluate(guard, env)?.is_truthy(),
                };
                if !keep_going {
                    break;
                }
            }

            iterations += 1;
            if iterations > self.config.max_loop_times {
                return Err(Error::evaluate(
                    format!("loop count exceeds the limit {}", self.config.max_loop_times),
                    lowered.call.location(),
                ));
            }

            let mut broke = false;
            for statement in &lowered.statements {
                self.evaluate(statement, env)?;
                if env.borrow().has_local(RETURN_NAME) {
                    // unwind through the loop, leaving the sentinel
                    return Ok(Value::Null);
                }
                if env.borrow_mut().take_local(BREAK_NAME).is_some() {
                    broke = true;
                    break;
                }
                if env.borrow_mut().take_local(CONTINUE_NAME).is_some() {
                    break;
                }
            }
            if broke {
                break;
            }

            for update in lowered.continuous.iter().skip(1) {
                self.evaluate(update, env)?;
            }
        }

        Ok(Value::Null)
    }

    /// Read through an access chain: resolve the root binding, then index
    /// or call per member.
    fn evaluate_get_members(
        &mut self,
        members: &[Statement],
        env: &EnvRef,
    ) -> Result<Value, Error> {
        let Some((first, rest)) = members.split_first() else {
            return Err(Error::evaluate("empty access chain", None));
        };

        let mut current = match first {
            Statement::Identifier { token } => self.lookup_identifier(token, env)?,
            other => self.evaluate(other, env)?,
        };

        for member in rest {
            let key = self.evaluate(member, env)?;
            current = index_value(current, &key, member.location())?;
        }
        Ok(current)
    }

    fn evaluate_set(
        &mut self,
        members: &[Statement],
        operator: &Token,
        value: &Statement,
        env: &EnvRef,
    ) -> Result<Value, Error> {
        let rhs = self.evaluate(value, env)?;

        // := writes the result-value of the current frame
        if members.is_empty() {
            env.borrow_mut().define(RESULT_NAME, rhs);
            return Ok(Value::Null);
        }

        // a callable bound to a further name becomes a reference
        let rhs = match rhs {
            Value::Function(function)
                if !function.is_reference
                    && matches!(operator.kind, TokenKind::Assign | TokenKind::Colon) =>
            {
                Value::Function(function.as_reference())
            }
            other => other,
        };

        self.assign_members(members, operator, rhs, env)?;
        Ok(Value::Null)
    }

    fn assign_members(
        &mut self,
        members: &[Statement],
        operator: &Token,
        rhs: Value,
        env: &EnvRef,
    ) -> Result<(), Error> {
        let Some(Statement::Identifier { token }) = members.first() else {
            return Err(Error::evaluate(
                "invalid assignment target",
                members.first().and_then(Statement::location),
            ));
        };
        let location = token.location.clone();

        // this chain's own keys evaluate in the current frame
        let mut tail = Vec::with_capacity(members.len() - 1);
        for member in &members[1..] {
            tail.push(self.evaluate(member, env)?);
        }

        let (name, target, mut path) = self.resolve_chain_root(token, env)?;
        path.extend(tail);

        if path.is_empty() {
            match operator.kind {
                // `:` defines in the current frame; nested JSON objects
                // must not leak into enclosing scopes
                TokenKind::Colon => target.borrow_mut().define(&name, rhs),
                TokenKind::Assign => target.borrow_mut().assign(&name, rhs),
                _ => {
                    let old = target.borrow().get(&name).ok_or_else(|| {
                        Error::evaluate(format!("'{name}' is undefined"), location.clone())
                    })?;
                    let new =
                        operator::apply_compound(operator, old, rhs, &self.config, location)?;
                    target.borrow_mut().modify(&name, new);
                }
            }
            return Ok(());
        }

        let mut root = target.borrow().get(&name).ok_or_else(|| {
            Error::evaluate(format!("'{name}' is undefined"), location.clone())
        })?;

        write_path(&mut root, &path, operator, rhs, &self.config, location)?;
        target.borrow_mut().assign(&name, root);
        Ok(())
    }

    /// Follow reference-parameter aliases back to the binding a write
    /// lands on: the final name, the frame chain it lives in, and the
    /// member path the alias chains contributed. Alias member keys
    /// evaluate in the frame the alias was taken from.
    fn resolve_chain_root(
        &mut self,
        token: &Token,
        env: &EnvRef,
    ) -> Result<(String, EnvRef, Vec<Value>), Error> {
        let name = token.lexeme.clone();

        let alias = env.borrow().find_alias(&name);
        let Some(alias) = alias else {
            return Ok((name, Rc::clone(env), vec![]));
        };

        let Some(Statement::Identifier { token: root_token }) = alias.members.first() else {
            return Err(Error::evaluate(
                format!("'{name}' does not refer to a variable"),
                token.location.clone(),
            ));
        };

        let mut tail = Vec::with_capacity(alias.members.len() - 1);
        for member in &alias.members[1..] {
            tail.push(self.evaluate(member, &alias.environment)?);
        }

        let (root_name, target, mut path) =
            self.resolve_chain_root(root_token, &alias.environment)?;
        path.extend(tail);
        Ok((root_name, target, path))
    }

    fn evaluate_remove(
        &mut self,
        token: &Token,
        members: &[Statement],
        env: &EnvRef,
    ) -> Result<Value, Error> {
        self.remove_members(token, members, env)?;
        Ok(Value::Null)
    }

    fn remove_members(
        &mut self,
        token: &Token,
        members: &[Statement],
        env: &EnvRef,
    ) -> Result<(), Error> {
        let Some(Statement::Identifier { token: root_token }) = members.first() else {
            return Err(Error::evaluate(
                "invalid remove target",
                token.location.clone(),
            ));
        };

        let mut tail = Vec::with_capacity(members.len() - 1);
        for member in &members[1..] {
            tail.push(self.evaluate(member, env)?);
        }

        let (name, target, mut path) = self.resolve_chain_root(root_token, env)?;
        path.extend(tail);

        if path.is_empty() {
            if !target.borrow_mut().remove(&name) {
                return Err(Error::evaluate(
                    format!("'{name}' is undefined"),
                    root_token.location.clone(),
                ));
            }
            return Ok(());
        }

        let mut root = target.borrow().get(&name).ok_or_else(|| {
            Error::evaluate(
                format!("'{name}' is undefined"),
                root_token.location.clone(),
            )
        })?;

        remove_path(&mut root, &path, token.location.clone())?;
        target.borrow_mut().assign(&name, root);
        Ok(())
    }
}

// ---- sentinel helpers ----------------------------------------------------

/// A pending return is stored as a one-element array (the payload) or an
/// empty array (a bare `return`), so the two stay distinguishable.
fn set_return(env: &EnvRef, payload: Option<Value>) {
    let marker = Value::Array(payload.into_iter().collect());
    env.borrow_mut().define(RETURN_NAME, marker);
}

fn unwrap_return(sentinel: Option<Value>) -> Option<Value> {
    match sentinel {
        Some(Value::Array(items)) if !items.is_empty() => items.into_iter().next(),
        _ => None,
    }
}

fn flow_pending(env: &EnvRef) -> bool {
    let env = env.borrow();
    env.has_local(RETURN_NAME) || env.has_local(BREAK_NAME) || env.has_local(CONTINUE_NAME)
}

// ---- container access ----------------------------------------------------

fn raw_index(key: &Value, location: &Option<Location>) -> Result<i64, Error> {
    match key {
        Value::Int(n) => Ok(*n),
        Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
        v => Err(Error::evaluate(
            format!("an index must be an integer, not {}", v.type_name()),
            location.clone(),
        )),
    }
}

/// Negative indices address the sequence from its end.
fn array_index(key: &Value, length: usize, location: &Option<Location>) -> Result<usize, Error> {
    let raw = raw_index(key, location)?;
    let adjusted = if raw < 0 { raw + length as i64 } else { raw };
    if adjusted < 0 || adjusted >= length as i64 {
        return Err(Error::evaluate(
            format!("the index {raw} is out of range"),
            location.clone(),
        ));
    }
    Ok(adjusted as usize)
}

fn index_value(container: Value, key: &Value, location: Option<Location>) -> Result<Value, Error> {
    match container {
        Value::Object(members) => {
            let Value::Str(k) = key else {
                return Err(Error::evaluate(
                    format!("an object member needs a string key, not {}", key.type_name()),
                    location,
                ));
            };
            Ok(members.get(k).cloned().unwrap_or(Value::Null))
        }
        Value::Array(values) => {
            let index = array_index(key, values.len(), &location)?;
            Ok(values[index].clone())
        }
        v => Err(Error::evaluate(
            format!("cannot index into {}", v.type_name()),
            location,
        )),
    }
}

fn step_into<'a>(
    container: &'a mut Value,
    key: &Value,
    location: &Option<Location>,
) -> Result<&'a mut Value, Error> {
    match container {
        Value::Object(members) => {
            let Value::Str(k) = key else {
                return Err(Error::evaluate(
                    format!("an object member needs a string key, not {}", key.type_name()),
                    location.clone(),
                ));
            };
            members.get_mut(k).ok_or_else(|| {
                Error::evaluate(format!("the member '{k}' does not exist"), location.clone())
            })
        }
        Value::Array(values) => {
            let index = array_index(key, values.len(), location)?;
            values.get_mut(index).ok_or_else(|| {
                Error::evaluate("the index is out of range", location.clone())
            })
        }
        v => Err(Error::evaluate(
            format!("cannot index into {}", v.type_name()),
            location.clone(),
        )),
    }
}

/// Write through a pre-evaluated member path. Intermediate members must
/// exist; the leaf may be a fresh object key or the index one past the end
/// of a sequence (an append), within the container-size cap.
fn write_path(
    container: &mut Value,
    path: &[Value],
    operator: &Token,
    rhs: Value,
    config: &Config,
    location: Option<Location>,
) -> Result<(), Error> {
    let Some((key, rest)) = path.split_first() else {
        return Err(Error::evaluate("invalid assignment target", location));
    };

    if !rest.is_empty() {
        let next = step_into(container, key, &location)?;
        return write_path(next, rest, operator, rhs, config, location);
    }

    let size_error = || {
        Error::evaluate(
            format!(
                "size of array or object exceeds the limit {}",
                config.max_array_size
            ),
            location.clone(),
        )
    };

    match container {
        Value::Object(members) => {
            let Value::Str(k) = key else {
                return Err(Error::evaluate(
                    format!("an object member needs a string key, not {}", key.type_name()),
                    location,
                ));
            };
            match operator.kind {
                TokenKind::Assign | TokenKind::Colon => {
                    if !members.contains_key(k) && members.len() + 1 > config.max_array_size {
                        return Err(size_error());
                    }
                    members.insert(k.clone(), rhs);
                }
                _ => {
                    let old = members.get(k).cloned().ok_or_else(|| {
                        Error::evaluate(
                            format!("the member '{k}' does not exist"),
                            location.clone(),
                        )
                    })?;
                    let new = operator::apply_compound(operator, old, rhs, config, location)?;
                    members.insert(k.clone(), new);
                }
            }
            Ok(())
        }
        Value::Array(values) => {
            match operator.kind {
                TokenKind::Assign | TokenKind::Colon => {
                    let raw = raw_index(key, &location)?;
                    let length = values.len() as i64;
                    let adjusted = if raw < 0 { raw + length } else { raw };
                    if adjusted == length {
                        if values.len() + 1 > config.max_array_size {
                            return Err(size_error());
                        }
                        values.push(rhs);
                    } else if let Some(slot) =
                        usize::try_from(adjusted).ok().and_then(|i| values.get_mut(i))
                    {
                        *slot = rhs;
                    } else {
                        return Err(Error::evaluate(
                            format!("the index {raw} is out of range"),
                            location,
                        ));
                    }
                }
                _ => {
                    let index = array_index(key, values.len(), &location)?;
                    let old = values[index].clone();
                    let new = operator::apply_compound(operator, old, rhs, config, location)?;
                    values[index] = new;
                }
            }
            Ok(())
        }
        v => Err(Error::evaluate(
            format!("cannot assign into {}", v.type_name()),
            location,
        )),
    }
}

fn remove_path(
    container: &mut Value,
    path: &[Value],
    location: Option<Location>,
) -> Result<(), Error> {
    let Some((key, rest)) = path.split_first() else {
        return Err(Error::evaluate("invalid remove target", location));
    };

    if !rest.is_empty() {
        let next = step_into(container, key, &location)?;
        return remove_path(next, rest, location);
    }

    match container {
        Value::Object(members) => {
            let Value::Str(k) = key else {
                return Err(Error::evaluate(
                    format!("an object member needs a string key, not {}", key.type_name()),
                    location,
                ));
            };
            if members.shift_remove(k).is_none() {
                return Err(Error::evaluate(
                    format!("the member '{k}' does not exist"),
                    location,
                ));
            }
            Ok(())
        }
        Value::Array(values) => {
            let index = array_index(key, values.len(), &location)?;
            values.remove(index);
            Ok(())
        }
        v => Err(Error::evaluate(
            format!("cannot remove from {}", v.type_name()),
            location,
        )),
    }
}
