//! The extension accessor.
//!
//! `extension(url)` rewrites to an equivalent traversal: navigate to the
//! `extension` child, then filter to the entries whose `url` child equals
//! the given literal. The rewrite reuses the traversal operator, the
//! equality operator and the where machinery rather than duplicating any
//! of them.

use crate::error::FhirPathResult;
use crate::filtering_functions::apply_where;
use crate::function::{NamedFunction, NamedFunctionInput, check_arity, string_literal_argument};
use crate::literal::build_literal;
use crate::operator::{BinaryOperator, invoke_binary};
use crate::parser::Literal;
use crate::traversal::traverse;

pub struct ExtensionFunction;

impl NamedFunction for ExtensionFunction {
    fn name(&self) -> &'static str {
        "extension"
    }

    fn invoke(&self, input: NamedFunctionInput<'_>) -> FhirPathResult<crate::path::PathValue> {
        check_arity(&input, "extension", 1, 1)?;
        let url = string_literal_argument(&input, 0, "extension")?;
        let ctx = input.context;

        let extension = traverse(
            ctx,
            &input.input,
            "extension",
            &format!("{}.extension", input.input.expression()),
        )?
        .path;

        // Build the url = '<literal>' criteria in the extension's item
        // context, exactly as the equivalent where() would.
        let this = extension.to_this_path(ctx.aliases())?;
        let url_path = traverse(ctx, &this, "url", "url")?.path;
        let url_literal = build_literal(&this, &Literal::String(url.clone()))?;
        let criteria = invoke_binary(
            ctx,
            BinaryOperator::Equals,
            url_path,
            url_literal,
            &format!("url = '{}'", url),
        )?;

        apply_where(ctx, &extension, &criteria, &input.expression)
    }
}
