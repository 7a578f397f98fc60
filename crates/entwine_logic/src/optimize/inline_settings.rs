//! Replaces Setting identifiers with their configured constant.

use crate::ast::{rewrite::rewrite_children, Node};
use crate::error::{OptimizeError, OptimizeErrorKind};
use crate::settings::SettingValue;
use crate::symbols::SymbolKind;
use crate::CompileEnv;

pub(crate) fn run<'a>(
    env: &mut CompileEnv<'a>,
    node: &'a Node<'a>,
) -> Result<&'a Node<'a>, OptimizeError> {
    let cx = env.ast;
    match *node {
        Node::Identifier(id) => {
            let symbol = env.symbols.symbol(id);
            if symbol.kind != SymbolKind::Setting {
                return Ok(node);
            }
            match env.settings.value(&symbol.name) {
                Some(SettingValue::Bool(value)) => Ok(cx.boolean(value)),
                Some(SettingValue::Number(value)) => Ok(cx.number(value)),
                None => Err(env.fail(OptimizeErrorKind::UnknownSetting {
                    name: symbol.name.clone(),
                })),
            }
        }
        _ => rewrite_children(cx, node, &mut |n| run(env, n)),
    }
}
