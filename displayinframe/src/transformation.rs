use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;
use wiki::reference::DocumentReference;
use wiki::{Block, MetaData, Syntax, Xdom};

use crate::context::MacroContext;
use crate::error::{MacroExecutionError, error_chain};
use crate::guard::Execution;
use crate::macros::Macro;

/// Upper bound on macro executions in one tree.
pub const MAX_EXPANSIONS: usize = 1000;

/// Priority given to macros nobody registered; they run last.
const UNKNOWN_PRIORITY: u32 = u32::MAX;

/// Where and for whom a tree is being transformed.
#[derive(Debug, Clone)]
pub struct TransformationContext {
    pub execution: Execution,
    pub target_syntax: Syntax,
}

impl TransformationContext {
    pub fn new(execution: Execution, target_syntax: Syntax) -> Self {
        TransformationContext {
            execution,
            target_syntax,
        }
    }
}

/// Executes the macro calls of a tree and splices their output in.
#[derive(Default)]
pub struct MacroTransformation {
    macros: BTreeMap<String, Arc<dyn Macro>>,
}

struct Pending {
    path: Vec<usize>,
    priority: u32,
    base: Option<DocumentReference>,
}

impl MacroTransformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, m: Arc<dyn Macro>) {
        self.macros.insert(m.descriptor().id.clone(), m);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Macro>> {
        self.macros.get(id)
    }

    pub fn macros(&self) -> impl Iterator<Item = &Arc<dyn Macro>> {
        self.macros.values()
    }

    /// Run macros, lowest priority number first and in document order among
    /// equals, until none is left. A failing macro is replaced by an error
    /// block. Returns the number of macros executed.
    pub fn transform(&self, xdom: &mut Xdom, context: &TransformationContext) -> usize {
        let mut executed = 0;

        loop {
            let mut next = None;
            self.find_next(&xdom.children, &mut Vec::new(), None, &mut next);
            let Some(pending) = next else {
                break;
            };
            if executed >= MAX_EXPANSIONS {
                warn!(limit = MAX_EXPANSIONS, "macro expansion limit reached");
                break;
            }

            let Some(Block::Macro(marker)) = block_at(&xdom.children, &pending.path).cloned() else {
                break;
            };

            let mut macro_context = MacroContext::new(context.execution.clone())
                .with_target_syntax(context.target_syntax)
                .with_id_generator(xdom.id_generator().clone());
            if let Some(base) = pending.base {
                macro_context = macro_context.with_base(base);
            }

            let result = match self.macros.get(&marker.id) {
                Some(m) => m.execute(&marker.parameters, marker.content.as_deref(), &macro_context),
                None => Err(MacroExecutionError::UnknownMacro(marker.id.clone())),
            };
            let replacement = result.unwrap_or_else(|err| {
                warn!(macro_id = %marker.id, error = %err, "macro execution failed");
                vec![error_block(&marker.id, &err)]
            });

            splice(&mut xdom.children, &pending.path, replacement);
            executed += 1;
        }

        executed
    }

    fn priority_of(&self, id: &str) -> u32 {
        self.macros
            .get(id)
            .map(|m| m.descriptor().priority)
            .unwrap_or(UNKNOWN_PRIORITY)
    }

    fn find_next(
        &self,
        blocks: &[Block],
        path: &mut Vec<usize>,
        base: Option<&DocumentReference>,
        best: &mut Option<Pending>,
    ) {
        for (idx, block) in blocks.iter().enumerate() {
            path.push(idx);
            match block {
                Block::Macro(marker) => {
                    let priority = self.priority_of(&marker.id);
                    if best.as_ref().is_none_or(|b| priority < b.priority) {
                        *best = Some(Pending {
                            path: path.clone(),
                            priority,
                            base: base.cloned(),
                        });
                    }
                }
                Block::MetaData { metadata, children } => {
                    let nested = metadata
                        .get(MetaData::BASE)
                        .and_then(|b| b.parse::<DocumentReference>().ok());
                    self.find_next(children, path, nested.as_ref().or(base), best);
                }
                other => self.find_next(other.children(), path, base, best),
            }
            path.pop();
        }
    }
}

fn error_block(id: &str, err: &MacroExecutionError) -> Block {
    Block::error(
        format!("Failed to execute the [{}] macro. Cause: [{}]", id, err),
        error_chain(err),
    )
}

fn block_at<'a>(blocks: &'a [Block], path: &[usize]) -> Option<&'a Block> {
    let (first, rest) = path.split_first()?;
    let block = blocks.get(*first)?;
    if rest.is_empty() {
        Some(block)
    } else {
        block_at(block.children(), rest)
    }
}

fn splice(blocks: &mut Vec<Block>, path: &[usize], replacement: Vec<Block>) {
    match path {
        [] => {}
        [idx] => {
            blocks.splice(*idx..*idx + 1, replacement);
        }
        [idx, rest @ ..] => {
            if let Some(children) = blocks.get_mut(*idx).and_then(Block::children_mut) {
                splice(children, rest, replacement);
            }
        }
    }
}
