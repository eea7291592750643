//! Source validation: parse, reject disallowed constructs, and
//! confirm the `decide` entry point exists with the right arity.
//!
//! Two layers of containment: (1) the engine itself is built
//! `no_module`/`no_closure` (Cargo feature flags removing `import` and
//! closure-capture from the
//! language entirely) and preloads no standard library, so filesystem,
//! network, process, and reflection facilities are never reachable even if
//! a script tries to name them; (2) an explicit `AST` walk rejects any call
//! to a function name outside the registered whitelist plus the script's
//! own top-level functions, catching anything the structural layer alone
//! wouldn't (e.g. a typo'd or future built-in this crate never registers).

use crate::engine::{build_engine, CompiledStrategy, WHITELISTED_FUNCTIONS};
use crate::error::ValidationError;
use rhai::{ASTNode, Expr};

/// Parse and validate `source`, returning a `CompiledStrategy` ready to be
/// cloned into workers.
pub fn validate(source: &str) -> Result<CompiledStrategy, ValidationError> {
    let engine = build_engine();

    let ast = engine
        .compile(source)
        .map_err(|e| ValidationError::ParseError(e.to_string()))?;

    check_forbidden_calls(&ast)?;
    check_decide_signature(&ast)?;

    Ok(CompiledStrategy { engine, ast })
}

fn check_forbidden_calls(ast: &rhai::AST) -> Result<(), ValidationError> {
    let declared: Vec<String> = ast
        .iter_functions()
        .map(|f| f.name.to_string())
        .collect();

    let mut violation: Option<ValidationError> = None;
    ast.walk(&mut |nodes: &[ASTNode]| {
        if let Some(ASTNode::Expr(Expr::FnCall(call, pos))) = nodes.last() {
            let name = call.name.as_str();
            let allowed = WHITELISTED_FUNCTIONS.contains(&name)
                || declared.iter().any(|d| d == name)
                || is_arithmetic_or_comparison(name);
            if !allowed {
                violation = Some(ValidationError::Forbidden {
                    reason: format!("call to disallowed function `{name}`"),
                    line: pos.line().unwrap_or(0),
                });
                return false;
            }
        }
        true
    });

    match violation {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// `rhai` desugars operators like `+`/`==` into ordinary function calls
/// against the same name; these are never disallowed.
fn is_arithmetic_or_comparison(name: &str) -> bool {
    matches!(
        name,
        "+" | "-"
            | "*"
            | "/"
            | "%"
            | "=="
            | "!="
            | "<"
            | "<="
            | ">"
            | ">="
            | "&&"
            | "||"
            | "!"
            | "[]"
            | "[]="
    )
}

fn check_decide_signature(ast: &rhai::AST) -> Result<(), ValidationError> {
    let found = ast
        .iter_functions()
        .any(|f| f.name == "decide" && f.params.len() == 2);
    if found {
        Ok(())
    } else {
        Err(ValidationError::MissingDecide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_strategy_compiles() {
        let source = r#"
            fn decide(window, state) {
                let closes = window.close;
                let fast = sma(closes, 5);
                #{ signal: "NONE" }
            }
        "#;
        assert!(validate(source).is_ok());
    }

    #[test]
    fn missing_decide_is_rejected() {
        let source = "fn not_decide(a, b) { #{} }";
        assert_eq!(validate(source), Err(ValidationError::MissingDecide));
    }

    #[test]
    fn wrong_arity_decide_is_rejected() {
        let source = "fn decide(window) { #{} }";
        assert_eq!(validate(source), Err(ValidationError::MissingDecide));
    }

    #[test]
    fn call_to_unregistered_function_is_forbidden() {
        let source = r#"
            fn decide(window, state) {
                open_file("/etc/passwd");
                #{ signal: "NONE" }
            }
        "#;
        assert!(matches!(
            validate(source),
            Err(ValidationError::Forbidden { .. })
        ));
    }

    #[test]
    fn import_statement_fails_to_parse() {
        // `no_module` removes `import` from the language entirely; this is
        // rejected at the parse stage, not the AST-walk stage.
        let source = r#"import "std" as std; fn decide(window, state) { #{} }"#;
        assert!(matches!(
            validate(source),
            Err(ValidationError::ParseError(_))
        ));
    }
}
