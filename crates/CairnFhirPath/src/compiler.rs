//! # The Grammar-Driven Compiler
//!
//! Parses expression text and compiles each step immediately against the
//! accumulating path value — there is no separate lowering pass. Member
//! navigation goes through the traversal operator (holding the recursion
//! guard open for the remainder of an invocation chain whenever a step
//! enters a self-referential structure), function calls dispatch through
//! the registry with arguments compiled in the input's item context, and
//! operators route through the operator module.
//!
//! A leading identifier naming the subject resource type re-roots the
//! chain at the subject context; a leading identifier naming a different
//! known resource type roots a foreign resource chain (as used by
//! `reverseResolve`).
//!
//! The query-level entry points compile whole queries into their three
//! categories — filters (singular boolean), groupings (materializable)
//! and aggregations (singular materializable) — plus extraction columns,
//! and compose the subject dataset with every compiled path. With no
//! filters or groupings the base resource dataset passes through
//! unchanged.

use cairn_columnar::{Dataset, JoinType, coalesce, lit};
use chumsky::Parser as _;
use tracing::debug;

use crate::context::ParserContext;
use crate::error::{FhirPathError, FhirPathResult, check_user_input};
use crate::function::NamedFunctionInput;
use crate::join::{JoinSet, join_paths};
use crate::literal::build_literal;
use crate::operator::{BinaryOperator, invoke_binary, invoke_indexer, invoke_polarity};
use crate::parser::{Expression, Invocation, Literal, Term, parser};
use crate::path::{PathValue, ResourcePath};
use crate::traversal::{TraversalResult, traverse};

/// Compiles expressions against a parser context.
pub struct ExpressionCompiler<'a> {
    ctx: &'a ParserContext,
}

/// One postfix step of an invocation chain.
enum Step<'e> {
    Invoke(&'e Invocation),
    Index(&'e Expression),
}

/// Unrolls the left-nested invocation/indexer spine into a root plus a
/// forward list of steps, so chains compile in reading order.
fn flatten(expression: &Expression) -> (&Expression, Vec<Step<'_>>) {
    let mut steps = Vec::new();
    let mut current = expression;
    loop {
        match current {
            Expression::Invocation(base, invocation) => {
                steps.push(Step::Invoke(invocation));
                current = base;
            }
            Expression::Indexer(base, index) => {
                steps.push(Step::Index(index));
                current = base;
            }
            _ => break,
        }
    }
    steps.reverse();
    (current, steps)
}

impl<'a> ExpressionCompiler<'a> {
    pub fn new(ctx: &'a ParserContext) -> Self {
        ExpressionCompiler { ctx }
    }

    /// Parses and compiles a complete expression. Opens the top-level
    /// compilation scope on the recursion guard; nested compilations of
    /// argument sub-expressions run inside this scope.
    pub fn compile(&self, text: &str) -> FhirPathResult<PathValue> {
        let ast = parser().parse(text).into_result().map_err(|errors| {
            let message = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            FhirPathError::ParseError { expression: text.to_string(), message }
        })?;
        let _scope = self.ctx.nesting().enter_compilation();
        let result = self.visit(&ast)?;
        debug!(expression = text, result = result.expression(), "compiled expression");
        Ok(result)
    }

    fn visit(&self, expression: &Expression) -> FhirPathResult<PathValue> {
        match expression {
            Expression::Term(term) => self.visit_term(term),
            Expression::Invocation(..) | Expression::Indexer(..) => {
                let (root, steps) = flatten(expression);
                match root {
                    Expression::Term(Term::Invocation(invocation)) => {
                        self.compile_head(invocation, &steps)
                    }
                    other => {
                        let current = self.visit(other)?;
                        self.compile_steps(current, &steps)
                    }
                }
            }
            Expression::Polarity(op, operand) => {
                let operand = self.visit(operand)?;
                invoke_polarity(self.ctx, *op, operand, &expression.to_string())
            }
            Expression::Multiplicative(l, op, r)
            | Expression::Additive(l, op, r)
            | Expression::Inequality(l, op, r)
            | Expression::Equality(l, op, r)
            | Expression::Membership(l, op, r)
            | Expression::Or(l, op, r) => self.binary(l, op, r, expression),
            Expression::And(l, r) => self.binary(l, "and", r, expression),
            Expression::Implies(l, r) => self.binary(l, "implies", r, expression),
            Expression::Union(l, r) => self.binary(l, "|", r, expression),
            Expression::Type(_, op, _) => Err(FhirPathError::InvalidInput(format!(
                "Type operator '{}' is not supported; narrow with ofType() instead: {}",
                op, expression
            ))),
        }
    }

    fn binary(
        &self,
        left: &Expression,
        token: &str,
        right: &Expression,
        whole: &Expression,
    ) -> FhirPathResult<PathValue> {
        let operator = BinaryOperator::from_token(token).ok_or_else(|| {
            FhirPathError::InvalidInput(format!(
                "Operator '{}' is not supported: {}",
                token, whole
            ))
        })?;
        let left = self.visit(left)?;
        let right = self.visit(right)?;
        invoke_binary(self.ctx, operator, left, right, &whole.to_string())
    }

    fn visit_term(&self, term: &Term) -> FhirPathResult<PathValue> {
        match term {
            Term::Literal(literal) => build_literal(&self.focus(), literal),
            Term::ExternalConstant(name) => Err(FhirPathError::InvalidInput(format!(
                "External constants are not supported: %{}",
                name
            ))),
            Term::Parenthesized(inner) => self.visit(inner),
            Term::Invocation(invocation) => self.compile_head(invocation, &[]),
        }
    }

    /// The focus a chain implicitly roots at: the item context when
    /// compiling an argument, the subject context otherwise.
    fn focus(&self) -> PathValue {
        self.ctx
            .this()
            .cloned()
            .unwrap_or_else(|| PathValue::Resource(self.ctx.input().clone()))
    }

    fn compile_head(&self, invocation: &Invocation, steps: &[Step<'_>]) -> FhirPathResult<PathValue> {
        match invocation {
            Invocation::This => {
                let this = self.ctx.this().cloned().ok_or_else(|| {
                    FhirPathError::InvalidInput(
                        "$this may only be used within a function argument".to_string(),
                    )
                })?;
                self.compile_steps(this, steps)
            }
            Invocation::Member(name) => {
                if name == self.ctx.subject_type() {
                    self.compile_steps(PathValue::Resource(self.ctx.input().clone()), steps)
                } else if self.ctx.registry().is_resource_type(name) {
                    let foreign = ResourcePath::build(
                        self.ctx.aliases(),
                        self.ctx.registry(),
                        self.ctx.source(),
                        name,
                        name,
                    )?;
                    self.compile_steps(PathValue::Resource(foreign), steps)
                } else {
                    let focus = self.focus();
                    let result = traverse(self.ctx, &focus, name, name)?;
                    self.continue_chain(result, steps)
                }
            }
            Invocation::Function(name, arguments) => {
                let path =
                    self.invoke_function(self.focus(), name, arguments, invocation.to_string())?;
                self.compile_steps(path, steps)
            }
        }
    }

    fn compile_steps(&self, current: PathValue, steps: &[Step<'_>]) -> FhirPathResult<PathValue> {
        let Some((first, rest)) = steps.split_first() else {
            return Ok(current);
        };
        match first {
            Step::Invoke(Invocation::Member(name)) => {
                let expression = format!("{}.{}", current.expression(), name);
                let result = traverse(self.ctx, &current, name, &expression)?;
                self.continue_chain(result, rest)
            }
            Step::Invoke(invocation @ Invocation::Function(name, arguments)) => {
                let expression = format!("{}.{}", current.expression(), invocation);
                let path = self.invoke_function(current, name, arguments, expression)?;
                self.compile_steps(path, rest)
            }
            Step::Invoke(Invocation::This) => Err(FhirPathError::InvalidInput(
                "$this may only begin a sub-expression".to_string(),
            )),
            Step::Index(index) => {
                let value = match index {
                    Expression::Term(Term::Literal(Literal::Integer(i))) => *i,
                    other => {
                        return Err(FhirPathError::InvalidInput(format!(
                            "Indexer must be an integer literal: {}",
                            other
                        )));
                    }
                };
                let expression = format!("{}[{}]", current.expression(), value);
                let path = invoke_indexer(self.ctx, current, value, &expression)?;
                self.compile_steps(path, rest)
            }
        }
    }

    /// Continues a chain after a traversal step. When the step entered a
    /// self-referential structure, the recursion guard stays open for the
    /// remainder of the chain, so deeper re-entries (and any argument
    /// sub-expressions compiled along the way) observe the raised nesting
    /// level.
    fn continue_chain(
        &self,
        result: TraversalResult,
        rest: &[Step<'_>],
    ) -> FhirPathResult<PathValue> {
        match result.entered_structure {
            Some(structure) => self
                .ctx
                .nesting()
                .with_definition(&structure, || self.compile_steps(result.path, rest)),
            None => self.compile_steps(result.path, rest),
        }
    }

    fn invoke_function(
        &self,
        input: PathValue,
        name: &str,
        arguments: &[Expression],
        expression: String,
    ) -> FhirPathResult<PathValue> {
        let function = self.ctx.functions().get(name).ok_or_else(|| {
            FhirPathError::InvalidInput(format!(
                "Unsupported function '{}': {}",
                name, expression
            ))
        })?;
        // Arguments compile in the input's item context, so they can be
        // derived from the base collection without a structural join.
        let argument_ctx = if input.is_literal() {
            self.ctx.clone()
        } else {
            self.ctx.with_this(input.to_this_path(self.ctx.aliases())?)
        };
        let argument_compiler = ExpressionCompiler::new(&argument_ctx);
        let arguments = arguments
            .iter()
            .map(|a| argument_compiler.visit(a))
            .collect::<FhirPathResult<Vec<_>>>()?;
        function.invoke(NamedFunctionInput {
            context: self.ctx,
            input,
            arguments,
            expression,
        })
    }
}

/// A fully compiled query: the category-checked expression paths, the
/// composed dataset, and the accumulated join set, ready for the
/// aggregation/extraction executors.
#[derive(Debug)]
pub struct CompiledQuery {
    pub filters: Vec<PathValue>,
    pub groupings: Vec<PathValue>,
    pub aggregations: Vec<PathValue>,
    pub dataset: Dataset,
    pub joins: JoinSet,
}

/// Compiles a filter expression: must resolve to a singular boolean.
pub fn compile_filter(ctx: &ParserContext, text: &str) -> FhirPathResult<PathValue> {
    let path = ExpressionCompiler::new(ctx).compile(text)?;
    check_user_input(path.is_singular() && path.is_boolean_type(), || {
        format!("Filter expression must be a singular Boolean: {}", text)
    })?;
    Ok(path)
}

/// Compiles a grouping expression: must be materializable to a concrete
/// domain value.
pub fn compile_grouping(ctx: &ParserContext, text: &str) -> FhirPathResult<PathValue> {
    let path = ExpressionCompiler::new(ctx).compile(text)?;
    check_user_input(path.is_materializable(), || {
        format!("Grouping expression is not materializable: {}", text)
    })?;
    Ok(path)
}

/// Compiles an aggregation expression: must resolve to a singular
/// materializable value.
pub fn compile_aggregation(ctx: &ParserContext, text: &str) -> FhirPathResult<PathValue> {
    let path = ExpressionCompiler::new(ctx).compile(text)?;
    check_user_input(path.is_singular() && path.is_materializable(), || {
        format!("Aggregation expression must be singular and materializable: {}", text)
    })?;
    Ok(path)
}

/// Compiles an extraction column: materializable, with collection values
/// permitted.
pub fn compile_extraction(ctx: &ParserContext, text: &str) -> FhirPathResult<PathValue> {
    let path = ExpressionCompiler::new(ctx).compile(text)?;
    check_user_input(path.is_materializable(), || {
        format!("Extraction expression is not materializable: {}", text)
    })?;
    Ok(path)
}

/// Compiles a whole query. Filters, groupings and aggregations are
/// category-checked, the subject dataset is composed with every filter
/// and grouping path, and filter predicates are applied. With no filters
/// and no groupings, composition is skipped and the base resource
/// dataset is used unchanged.
pub fn compile_query(
    ctx: &ParserContext,
    filters: &[&str],
    groupings: &[&str],
    aggregations: &[&str],
) -> FhirPathResult<CompiledQuery> {
    let filter_paths = filters
        .iter()
        .map(|text| compile_filter(ctx, text))
        .collect::<FhirPathResult<Vec<_>>>()?;
    let grouping_paths = groupings
        .iter()
        .map(|text| compile_grouping(ctx, text))
        .collect::<FhirPathResult<Vec<_>>>()?;
    let aggregation_paths = aggregations
        .iter()
        .map(|text| compile_aggregation(ctx, text))
        .collect::<FhirPathResult<Vec<_>>>()?;

    let mut joins = JoinSet::new();
    for path in filter_paths
        .iter()
        .chain(grouping_paths.iter())
        .chain(aggregation_paths.iter())
    {
        joins.merge(&path.joins());
    }

    let subject = PathValue::Resource(ctx.input().clone());
    let dataset = if filter_paths.is_empty() && grouping_paths.is_empty() {
        subject.dataset().clone()
    } else {
        let mut operands: Vec<&PathValue> = vec![&subject];
        operands.extend(filter_paths.iter());
        operands.extend(grouping_paths.iter());
        let (mut dataset, _) = join_paths(&operands, JoinType::LeftOuter)?;
        for filter in &filter_paths {
            dataset = dataset.filter(coalesce(vec![filter.value_column(), lit(false)]));
        }
        dataset
    };

    Ok(CompiledQuery {
        filters: filter_paths,
        groupings: grouping_paths,
        aggregations: aggregation_paths,
        dataset,
        joins,
    })
}
