//! Resolves every name in the entry function and decides, for each local
//! variable, whether it can live in a plain JavaScript local or has to be
//! boxed because an escaping function literal captures it.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::{HashMap, HashSet};
use log::{debug, trace};

use crate::{
    error::AnalysisError,
    frontend::{
        ast::{
            BinaryOperatorKind, Block, Declarator, Expression, ExpressionKind, FunctionDefinition,
            FunctionLiteral, FunctionParameter, Identifier, Local, NodeId, Statement,
            StatementKind,
            visit::{Visitor, walk_block, walk_expression, walk_statement},
        },
        intern::Symbol,
        lexer::Span,
    },
    index::{Index, IndexVec, simple_index},
    middle::{
        eval::Constant,
        ty::{StaticType, TypeEnvironment, binary_result_type, type_of},
    },
};

simple_index! {
    /// A local variable or parameter declared somewhere in the unit
    pub struct VariableId;
}

simple_index! {
    /// The unit itself (always index 0) or one of its function literals
    pub struct FunctionId;
}

simple_index! {
    /// A block or parameter scope
    pub struct ScopeId;
}

impl FunctionId {
    pub const UNIT: FunctionId = FunctionId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Stack,
    Boxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy)]
pub struct VariableSite {
    pub access: Access,
    pub function: FunctionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Local(Declarator),
    Parameter,
}

#[derive(Debug)]
pub struct Variable {
    pub id: VariableId,
    pub name: Symbol,
    pub span: Span,
    pub kind: VariableKind,
    pub function: FunctionId,
    pub scope: ScopeId,
    /// Declared inside a loop body of its own function, so every iteration
    /// gets a fresh variable
    pub per_iteration: bool,
    /// Annotation, or the join of every value assigned
    pub ty: StaticType,
    /// Scalar literal initializer, if any
    pub initial_constant: Option<Constant>,
    pub status: CaptureStatus,
    pub sites: Vec<VariableSite>,
    annotated: bool,
}

impl Variable {
    pub fn is_mutable(&self) -> bool {
        match self.kind {
            VariableKind::Local(declarator) => declarator.is_mutable(),
            VariableKind::Parameter => true,
        }
    }

    pub fn is_written(&self) -> bool {
        self.sites.iter().any(|site| site.access == Access::Write)
    }

    pub fn is_boxed(&self) -> bool {
        self.status == CaptureStatus::Boxed
    }

    /// The literal value of a local that is initialized with a scalar literal
    /// and never written afterwards.
    pub fn constant_value(&self) -> Option<&Constant> {
        match self.kind {
            VariableKind::Local(_) if !self.is_written() => self.initial_constant.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct FunctionInfo {
    pub id: FunctionId,
    pub parent: Option<FunctionId>,
    /// Name used in diagnostics
    pub name: Symbol,
    pub parameters: Vec<VariableId>,
    /// Free variables in order of first reference, including those only used
    /// by nested literals
    pub captures: Vec<VariableId>,
    /// Boxed captures whose variable is fresh per loop iteration. The closure
    /// binds these boxes when it is created.
    pub iteration_captures: Vec<VariableId>,
    /// False for literals that are called immediately where they are written
    pub escapes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Variable(VariableId),
    Print,
}

#[derive(Debug)]
pub struct CaptureAnalysis {
    pub variables: IndexVec<VariableId, Variable>,
    pub functions: IndexVec<FunctionId, FunctionInfo>,
    resolutions: BTreeMap<NodeId, Resolution>,
    declarations: BTreeMap<NodeId, VariableId>,
    function_literals: BTreeMap<NodeId, FunctionId>,
}

impl CaptureAnalysis {
    pub fn analyze(function: &FunctionDefinition) -> Result<Self, AnalysisError> {
        let mut analyzer = CaptureAnalyzer::new();

        analyzer.bind_built_ins();
        analyzer.analyze_unit(function);

        if let Some(error) = analyzer.error {
            return Err(error);
        }

        analyzer.infer_types();
        analyzer.classify();

        Ok(Self {
            variables: analyzer.variables,
            functions: analyzer.functions,
            resolutions: analyzer.resolutions,
            declarations: analyzer.declarations,
            function_literals: analyzer.function_literals,
        })
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id]
    }

    pub fn function(&self, id: FunctionId) -> &FunctionInfo {
        &self.functions[id]
    }

    /// Resolution of an identifier use. Every use in an analyzed unit has one.
    pub fn resolution(&self, identifier: &Identifier) -> Resolution {
        self.resolutions[&identifier.id]
    }

    /// The variable introduced by a `Local` or `FunctionParameter` node.
    pub fn declared_variable(&self, declaration: NodeId) -> VariableId {
        self.declarations[&declaration]
    }

    pub fn function_literal(&self, literal: &FunctionLiteral) -> &FunctionInfo {
        &self.functions[self.function_literals[&literal.id]]
    }
}

impl TypeEnvironment for CaptureAnalysis {
    fn type_of_identifier(&self, identifier: &Identifier) -> StaticType {
        match self.resolutions.get(&identifier.id) {
            Some(Resolution::Variable(id)) => self.variables[*id].ty,
            Some(Resolution::Print) => StaticType::Function,
            None => StaticType::Dynamic,
        }
    }
}

/// A value flowing into an unannotated variable.
#[derive(Debug, Clone, Copy)]
enum TypeSource<'ast> {
    Value(&'ast Expression),
    Compound(BinaryOperatorKind, &'ast Expression),
}

#[derive(Debug)]
struct CaptureAnalyzer<'ast> {
    scopes: ScopeStack<Resolution>,
    variables: IndexVec<VariableId, Variable>,
    functions: IndexVec<FunctionId, FunctionInfo>,
    function_stack: Vec<FunctionId>,
    resolutions: BTreeMap<NodeId, Resolution>,
    declarations: BTreeMap<NodeId, VariableId>,
    function_literals: BTreeMap<NodeId, FunctionId>,
    immediately_invoked: HashSet<NodeId>,
    type_sources: Vec<(VariableId, TypeSource<'ast>)>,
    /// Loops enclosing the current point within the current function
    loop_depth: usize,
    /// Name of the variable the next function literal is bound to
    pending_function_name: Option<Symbol>,
    error: Option<AnalysisError>,
}

impl<'ast> CaptureAnalyzer<'ast> {
    fn new() -> Self {
        Self {
            scopes: ScopeStack::new(),
            variables: IndexVec::new(),
            functions: IndexVec::new(),
            function_stack: Vec::new(),
            resolutions: BTreeMap::new(),
            declarations: BTreeMap::new(),
            function_literals: BTreeMap::new(),
            immediately_invoked: HashSet::new(),
            type_sources: Vec::new(),
            loop_depth: 0,
            pending_function_name: None,
            error: None,
        }
    }

    fn bind_built_ins(&mut self) {
        self.scopes
            .add_global_binding(Symbol::intern("print"), Resolution::Print);
    }

    fn analyze_unit(&mut self, function: &'ast FunctionDefinition) {
        let id = self.functions.push(FunctionInfo {
            id: FunctionId::UNIT,
            parent: None,
            name: function.name.symbol,
            parameters: Vec::new(),
            captures: Vec::new(),
            iteration_captures: Vec::new(),
            escapes: false,
        });

        self.function_stack.push(id);
        self.scopes.push_shallow_scope();

        for parameter in &function.parameters.parameters {
            self.declare_parameter(id, parameter);
        }

        self.visit_block(&function.body);

        self.scopes.pop_shallow_scope();
        self.function_stack.pop();
    }

    fn current_function(&self) -> FunctionId {
        *self
            .function_stack
            .last()
            .expect("the unit stays on the function stack for the whole walk")
    }

    fn current_function_name(&self) -> String {
        self.functions[self.current_function()].name.to_string()
    }

    fn report(&mut self, error: AnalysisError) {
        self.error.get_or_insert(error);
    }

    fn declare_parameter(&mut self, function: FunctionId, parameter: &FunctionParameter) {
        let ty = parameter
            .ty
            .as_ref()
            .map_or(StaticType::Dynamic, |ty| {
                StaticType::from_annotation(ty.symbol.value())
            });

        if let Some(id) = self.declare(
            &parameter.name,
            parameter.id,
            VariableKind::Parameter,
            ty,
            parameter.ty.is_some(),
            None,
        ) {
            self.functions[function].parameters.push(id);
        }
    }

    fn declare(
        &mut self,
        name: &Identifier,
        declaration: NodeId,
        kind: VariableKind,
        ty: StaticType,
        annotated: bool,
        initial_constant: Option<Constant>,
    ) -> Option<VariableId> {
        if self.scopes.get_shallow_binding(name.symbol).is_some() {
            self.report(AnalysisError::DuplicateBinding {
                name: name.symbol.to_string(),
                function: self.current_function_name(),
                span: name.span,
            });
            return None;
        }

        let id = self.variables.next_index();

        self.variables.push(Variable {
            id,
            name: name.symbol,
            span: name.span,
            kind,
            function: self.current_function(),
            scope: self.scopes.current_scope(),
            per_iteration: self.loop_depth > 0,
            ty,
            initial_constant,
            status: CaptureStatus::Stack,
            sites: Vec::new(),
            annotated,
        });

        self.scopes
            .add_shallow_binding(name.symbol, Resolution::Variable(id));
        self.declarations.insert(declaration, id);

        Some(id)
    }

    /// Records a use of `identifier`, marking it captured by every function
    /// literal between the use and the declaration.
    fn resolve_use(&mut self, identifier: &Identifier, access: Access) -> Option<Resolution> {
        let Some(resolution) = self.scopes.get_binding(identifier.symbol).copied() else {
            self.report(AnalysisError::UnresolvedName {
                name: identifier.symbol.to_string(),
                function: self.current_function_name(),
                span: identifier.span,
            });
            return None;
        };

        self.resolutions.insert(identifier.id, resolution);

        let id = match resolution {
            Resolution::Variable(id) => id,
            Resolution::Print => {
                if access == Access::Write {
                    self.report(AnalysisError::ImmutableAssignment {
                        name: identifier.symbol.to_string(),
                        function: self.current_function_name(),
                        span: identifier.span,
                    });
                }

                return Some(resolution);
            }
        };

        if access == Access::Write && !self.variables[id].is_mutable() {
            self.report(AnalysisError::ImmutableAssignment {
                name: identifier.symbol.to_string(),
                function: self.current_function_name(),
                span: identifier.span,
            });
        }

        let current = self.current_function();
        let declaring = self.variables[id].function;

        self.variables[id].sites.push(VariableSite {
            access,
            function: current,
        });

        for &function in self.function_stack.iter().rev() {
            if function == declaring {
                break;
            }

            let captures = &mut self.functions[function].captures;

            if !captures.contains(&id) {
                captures.push(id);
            }
        }

        trace!(
            "{access:?} of `{}` ({id:?}) in {current:?}, declared in {declaring:?}",
            identifier.symbol
        );

        Some(resolution)
    }

    /// Widens the type of an assigned variable with the type of the new value
    /// and remembers the value for `infer_types`.
    fn record_assignment(&mut self, resolution: Option<Resolution>, source: TypeSource<'ast>) {
        if let Some(Resolution::Variable(id)) = resolution {
            let ty = self.type_of_source(id, source);
            let variable = &mut self.variables[id];

            if !variable.annotated {
                variable.ty = variable.ty.join(ty);
                self.type_sources.push((id, source));
            }
        }
    }

    fn type_of_source(&self, target: VariableId, source: TypeSource<'ast>) -> StaticType {
        match source {
            TypeSource::Value(value) => type_of(value, self),
            TypeSource::Compound(operator, rhs) => {
                binary_result_type(operator, self.variables[target].ty, type_of(rhs, self))
            }
        }
    }

    /// Joins every recorded value into its variable until nothing widens.
    /// Types seen during the walk can be stale when a source variable is
    /// widened by a later assignment.
    fn infer_types(&mut self) {
        let mut changed = true;

        while changed {
            changed = false;

            for index in 0..self.type_sources.len() {
                let (id, source) = self.type_sources[index];
                let ty = self.variables[id].ty.join(self.type_of_source(id, source));

                if ty != self.variables[id].ty {
                    trace!("`{}` ({id:?}) widens to {ty}", self.variables[id].name);

                    self.variables[id].ty = ty;
                    changed = true;
                }
            }
        }
    }

    /// A variable is boxed iff some escaping function literal captures it.
    fn classify(&mut self) {
        for function in self.functions.iter().filter(|function| function.escapes) {
            for &id in &function.captures {
                self.variables[id].status = CaptureStatus::Boxed;
            }
        }

        for index in 0..self.functions.len() {
            let id = FunctionId::new(index);
            let iteration_captures = self.iteration_captures(id);

            self.functions[id].iteration_captures = iteration_captures;
        }

        for variable in self.variables.iter() {
            let nested_sites = variable
                .sites
                .iter()
                .filter(|site| site.function != variable.function)
                .count();

            debug!(
                "`{}` ({:?}) at {}..{} in {:?} {:?}: {:?}, {} site(s), {} nested, type {}",
                variable.name,
                variable.id,
                variable.span.start,
                variable.span.end,
                variable.function,
                variable.scope,
                variable.status,
                variable.sites.len(),
                nested_sites,
                variable.ty
            );
        }
    }
}

impl CaptureAnalyzer<'_> {
    /// Loop-fresh captures an escaping literal must bind on creation. A box
    /// already bound by an escaping ancestor literal stays fixed for it.
    fn iteration_captures(&self, function: FunctionId) -> Vec<VariableId> {
        let info = &self.functions[function];

        if !info.escapes {
            return Vec::new();
        }

        info.captures
            .iter()
            .copied()
            .filter(|&id| {
                let variable = &self.variables[id];

                variable.per_iteration
                    && variable.is_boxed()
                    && !self.escapes_between(info.parent, variable.function)
            })
            .collect()
    }

    /// Whether an escaping literal lies on the parent chain from `function`
    /// up to, but excluding, `declaring`.
    fn escapes_between(&self, mut function: Option<FunctionId>, declaring: FunctionId) -> bool {
        while let Some(id) = function {
            if id == declaring {
                return false;
            }

            if self.functions[id].escapes {
                return true;
            }

            function = self.functions[id].parent;
        }

        false
    }
}

impl TypeEnvironment for CaptureAnalyzer<'_> {
    fn type_of_identifier(&self, identifier: &Identifier) -> StaticType {
        match self.resolutions.get(&identifier.id) {
            Some(Resolution::Variable(id)) => self.variables[*id].ty,
            Some(Resolution::Print) => StaticType::Function,
            None => StaticType::Dynamic,
        }
    }
}

impl<'ast> Visitor<'ast> for CaptureAnalyzer<'ast> {
    fn visit_block(&mut self, block: &'ast Block) {
        self.scopes.push_shallow_scope();
        walk_block(self, block);
        self.scopes.pop_shallow_scope();
    }

    fn visit_statement(&mut self, statement: &'ast Statement) {
        match &statement.kind {
            StatementKind::While { condition, body } => {
                self.visit_expression(condition);

                self.loop_depth += 1;
                self.visit_statement(body);
                self.loop_depth -= 1;
            }
            _ => walk_statement(self, statement),
        }
    }

    fn visit_local(&mut self, local: &'ast Local) {
        // The initializer cannot see the name being declared
        if let Some(initializer) = &local.initializer {
            if initializer.as_function_literal().is_some() {
                self.pending_function_name = Some(local.name.symbol);
            }

            self.visit_expression(initializer);
        }

        let ty = match (&local.ty, &local.initializer) {
            (Some(annotation), _) => StaticType::from_annotation(annotation.symbol.value()),
            (None, Some(initializer)) => type_of(initializer, self),
            (None, None) => StaticType::Null,
        };

        let initial_constant = local
            .initializer
            .as_deref()
            .and_then(Constant::from_expression);

        let id = self.declare(
            &local.name,
            local.id,
            VariableKind::Local(local.declarator),
            ty,
            local.ty.is_some(),
            initial_constant,
        );

        if let (Some(id), None, Some(initializer)) = (id, &local.ty, &local.initializer) {
            self.type_sources.push((id, TypeSource::Value(initializer)));
        }
    }

    fn visit_expression(&mut self, expression: &'ast Expression) {
        match &expression.kind {
            ExpressionKind::Identifier(identifier) => {
                self.resolve_use(identifier, Access::Read);
            }
            ExpressionKind::Assignment { target, rhs } => {
                if rhs.as_function_literal().is_some() {
                    self.pending_function_name = Some(target.symbol);
                }

                self.visit_expression(rhs);

                let resolution = self.resolve_use(target, Access::Write);

                self.record_assignment(resolution, TypeSource::Value(rhs));
            }
            ExpressionKind::OperatorAssignment {
                operator,
                target,
                rhs,
            } => {
                let resolution = self.resolve_use(target, Access::Read);

                self.visit_expression(rhs);
                self.resolve_use(target, Access::Write);
                self.record_assignment(
                    resolution,
                    TypeSource::Compound(operator.kind.binary(), rhs),
                );
            }
            ExpressionKind::FunctionCall { target, .. } => {
                if let Some(literal) = target.as_function_literal() {
                    self.immediately_invoked.insert(literal.id);
                }

                walk_expression(self, expression);
            }
            _ => walk_expression(self, expression),
        }
    }

    fn visit_function_literal(&mut self, literal: &'ast FunctionLiteral) {
        let parent = self.current_function();
        let id = self.functions.push(FunctionInfo {
            id: self.functions.next_index(),
            parent: Some(parent),
            name: self
                .pending_function_name
                .take()
                .unwrap_or_else(|| Symbol::intern("<closure>")),
            parameters: Vec::new(),
            captures: Vec::new(),
            iteration_captures: Vec::new(),
            escapes: !self.immediately_invoked.contains(&literal.id),
        });
        let enclosing_loops = std::mem::take(&mut self.loop_depth);

        self.function_literals.insert(literal.id, id);
        self.function_stack.push(id);
        self.scopes.push_shallow_scope();

        for parameter in &literal.parameters.parameters {
            self.declare_parameter(id, parameter);
        }

        self.visit_block(&literal.body);

        self.scopes.pop_shallow_scope();
        self.function_stack.pop();
        self.loop_depth = enclosing_loops;
    }
}

#[derive(Debug)]
struct ScopeStack<R> {
    global_scope: HashMap<Symbol, R>,
    stack: VecDeque<(ScopeId, HashMap<Symbol, R>)>,
    next_scope: ScopeId,
}

impl<R> ScopeStack<R> {
    fn new() -> Self {
        Self {
            global_scope: HashMap::new(),
            stack: VecDeque::new(),
            next_scope: ScopeId::new(0),
        }
    }

    /// Creates a new block or parameter scope
    fn push_shallow_scope(&mut self) {
        let id = self.next_scope;

        self.next_scope.increment_by(1);
        self.stack.push_back((id, HashMap::new()));
    }

    /// Destroys the current block or parameter scope
    fn pop_shallow_scope(&mut self) {
        assert!(
            self.stack.pop_back().is_some(),
            "Attempted to pop a shallow scope from the global context"
        );
    }

    fn current_scope(&self) -> ScopeId {
        self.stack
            .back()
            .map(|(id, _)| *id)
            .expect("Tried to get the current scope from the global context")
    }

    /// Looks for a binding only within the current (most nested) scope
    fn get_shallow_binding(&self, symbol: Symbol) -> Option<&R> {
        self.stack
            .back()
            .and_then(|(_, scope)| scope.get(&symbol))
    }

    /// Adds a binding only within the current (most nested) scope
    fn add_shallow_binding(&mut self, symbol: Symbol, resolution: R) {
        let (_, shallow_scope) = self
            .stack
            .back_mut()
            .expect("Tried to add a shallow binding in the global context");

        shallow_scope.insert(symbol, resolution);
    }

    /// Adds a binding into the global scope which is accessible from all
    /// shallow scopes
    fn add_global_binding(&mut self, symbol: Symbol, resolution: R) {
        self.global_scope.insert(symbol, resolution);
    }

    /// Traverses the scope stack from back to front looking for bindings before
    /// checking the global scope.
    fn get_binding(&self, symbol: Symbol) -> Option<&R> {
        for (_, scope) in self.stack.iter().rev() {
            if let Some(binding) = scope.get(&symbol) {
                return Some(binding);
            }
        }

        self.global_scope.get(&symbol)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::{CaptureAnalysis, CaptureStatus, FunctionId};
    use crate::index::Index;
    use crate::{
        error::AnalysisError,
        frontend::{SourceFile, parser::Parser},
        middle::ty::StaticType,
    };

    fn analyze(source: &str) -> Result<CaptureAnalysis, AnalysisError> {
        let source_file = SourceFile::from_memory(source);
        let module = Parser::parse_module(&source_file).unwrap();

        CaptureAnalysis::analyze(module.function("main").unwrap())
    }

    fn status_of(analysis: &CaptureAnalysis, name: &str) -> CaptureStatus {
        analysis
            .variables
            .iter()
            .find(|variable| variable.name.value() == name)
            .unwrap_or_else(|| panic!("no variable named `{name}`"))
            .status
    }

    #[test]
    fn returned_closure_boxes_its_captures() {
        let analysis = analyze(indoc! {"
            main() {
              var x = 122;
              var a = () {
                var y = x;
                return () => y;
              };
              x = x + 1;
              print(a()());
            }
        "})
        .unwrap();

        assert_eq!(status_of(&analysis, "x"), CaptureStatus::Boxed);
        assert_eq!(status_of(&analysis, "y"), CaptureStatus::Boxed);
        assert_eq!(status_of(&analysis, "a"), CaptureStatus::Stack);

        let outer = analysis.function(FunctionId::new(1));
        assert_eq!(outer.name.value(), "a");
        assert!(outer.escapes);
        assert_eq!(outer.captures.len(), 1);
        assert_eq!(analysis.variable(outer.captures[0]).name.value(), "x");
    }

    #[test]
    fn immediately_invoked_literal_does_not_box() {
        let analysis = analyze(indoc! {"
            main() {
              var count = 0;
              (() { count = count + 1; })();
              print(count);
            }
        "})
        .unwrap();

        assert_eq!(status_of(&analysis, "count"), CaptureStatus::Stack);
        assert!(!analysis.function(FunctionId::new(1)).escapes);
    }

    #[test]
    fn grandchild_capture_is_transitive() {
        let analysis = analyze(indoc! {"
            main() {
              var total = 1;
              var outer = () {
                var inner = () => total;
                return inner;
              };
              print(outer()());
            }
        "})
        .unwrap();

        let outer = analysis.function(FunctionId::new(1));
        let inner = analysis.function(FunctionId::new(2));

        assert_eq!(status_of(&analysis, "total"), CaptureStatus::Boxed);
        assert_eq!(outer.captures, inner.captures);
        assert_eq!(inner.parent, Some(FunctionId::new(1)));
        assert_eq!(status_of(&analysis, "inner"), CaptureStatus::Stack);
    }

    #[test]
    fn siblings_share_one_variable() {
        let analysis = analyze(indoc! {"
            main() {
              var shared = 0;
              var increment = () { shared += 1; };
              var read = () => shared;
              increment();
              print(read());
            }
        "})
        .unwrap();

        let shared = analysis
            .variables
            .iter()
            .find(|variable| variable.name.value() == "shared")
            .unwrap();

        assert!(shared.is_boxed());
        assert!(shared.is_written());
        assert_eq!(
            analysis.function(FunctionId::new(1)).captures,
            analysis.function(FunctionId::new(2)).captures
        );
    }

    #[test]
    fn constant_locals_and_types_are_recorded() {
        let analysis = analyze(indoc! {"
            main() {
              var e = 1;
              var n = 1;
              n = 2.5;
              var l = [1, 2, 3];
              print('$e $n $l');
            }
        "})
        .unwrap();

        let find = |name: &str| {
            analysis
                .variables
                .iter()
                .find(|variable| variable.name.value() == name)
                .unwrap()
        };

        assert!(find("e").constant_value().is_some());
        assert!(find("n").constant_value().is_none());
        assert_eq!(find("n").ty, StaticType::Number);
        assert_eq!(find("l").ty, StaticType::List);
    }

    #[test]
    fn types_widen_through_later_assignments() {
        let analysis = analyze(indoc! {"
            main() {
              var a = 'x';
              var b = a;
              var f = () { b = a; };
              a = 1;
              f();
              print(b);
            }
        "})
        .unwrap();

        let find = |name: &str| {
            analysis
                .variables
                .iter()
                .find(|variable| variable.name.value() == name)
                .unwrap()
        };

        assert_eq!(find("a").ty, StaticType::Dynamic);
        assert_eq!(find("b").ty, StaticType::Dynamic);
        assert_eq!(find("f").ty, StaticType::Function);
    }

    #[test]
    fn loop_locals_are_bound_per_iteration() {
        let analysis = analyze(indoc! {"
            main() {
              var outside = 0;
              var keep;
              while (outside < 2) {
                var inside = outside;
                keep = () => inside + outside;
                outside = outside + 1;
              }
              print(keep());
            }
        "})
        .unwrap();

        let closure = analysis.function(FunctionId::new(1));

        assert_eq!(status_of(&analysis, "inside"), CaptureStatus::Boxed);
        assert_eq!(status_of(&analysis, "outside"), CaptureStatus::Boxed);
        assert_eq!(closure.captures.len(), 2);
        assert_eq!(closure.iteration_captures.len(), 1);
        assert_eq!(
            analysis.variable(closure.iteration_captures[0]).name.value(),
            "inside"
        );
    }

    #[test]
    fn loops_outside_a_literal_do_not_make_its_locals_fresh() {
        let analysis = analyze(indoc! {"
            main() {
              var i = 0;
              while (i < 2) {
                var make = () {
                  var y = i;
                  return () => y;
                };
                print(make()());
                i = i + 1;
              }
            }
        "})
        .unwrap();

        let y = analysis
            .variables
            .iter()
            .find(|variable| variable.name.value() == "y")
            .unwrap();

        assert!(y.is_boxed());
        assert!(!y.per_iteration);
        assert!(analysis.function(FunctionId::new(2)).iteration_captures.is_empty());
    }

    #[test]
    fn unresolved_name_is_reported() {
        let error = analyze("main() { print(missing); }").unwrap_err();

        assert!(matches!(
            error,
            AnalysisError::UnresolvedName { ref name, ref function, .. }
                if name == "missing" && function == "main"
        ));
    }

    #[test]
    fn duplicate_and_immutable_bindings_are_reported() {
        assert!(matches!(
            analyze("main() { var a = 1; var a = 2; }").unwrap_err(),
            AnalysisError::DuplicateBinding { .. }
        ));
        assert!(matches!(
            analyze("main() { final a = 1; a = 2; }").unwrap_err(),
            AnalysisError::ImmutableAssignment { .. }
        ));
        assert!(matches!(
            analyze("main() { print = 2; }").unwrap_err(),
            AnalysisError::ImmutableAssignment { .. }
        ));
    }

    #[test]
    fn shadowing_in_nested_block_is_allowed() {
        let analysis = analyze("main() { var a = 1; { var a = 2; print(a); } print(a); }").unwrap();

        assert_eq!(analysis.variables.len(), 2);
        assert_ne!(analysis.variables.raw[0].scope, analysis.variables.raw[1].scope);
    }
}
