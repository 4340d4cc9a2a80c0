//! Bundle assembly.
//!
//! A bundle is the registry prelude called with an object of module
//! functions keyed by id, followed by the entry id.

use crate::graph::ModuleGraph;
use crate::linker::js_string;

const PRELUDE: &str = include_str!("runtime/prelude.js");

/// Render `graph` as one self-executing script.
pub fn assemble(graph: &ModuleGraph) -> String {
    let body_len: usize = graph.modules.values().map(|m| m.code.len() + 96).sum();
    let mut out = String::with_capacity(PRELUDE.len() + body_len);

    out.push_str(PRELUDE.trim_end());
    out.push_str("({\n");
    for (index, (id, module)) in graph.modules.iter().enumerate() {
        if index > 0 {
            out.push_str(",\n");
        }
        out.push_str(&js_string(id));
        out.push_str(": function (module, exports, __kiln_require) {\n\"use strict\";\n");
        out.push_str(module.code.trim_end());
        out.push_str("\n}");
    }
    out.push_str("\n}, ");
    out.push_str(&js_string(&graph.entry));
    out.push_str(");\n");
    out
}
