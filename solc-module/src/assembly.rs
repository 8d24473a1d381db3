use serde_json::Value;
use std::fmt::Write;

const SNIPPET_LEN: usize = 30;

fn escape(text: &str) -> String {
    text.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

fn snippet(source: Option<&str>, item: &Value) -> String {
    let (source, begin, end) = match (
        source,
        item.get("begin").and_then(Value::as_u64),
        item.get("end").and_then(Value::as_u64),
    ) {
        (Some(source), Some(begin), Some(end)) => (source, begin as usize, end as usize),
        _ => return String::new(),
    };
    let bytes = source.as_bytes();
    let begin = begin.min(bytes.len());
    let end = end.min(bytes.len()).max(begin);
    let text = escape(&String::from_utf8_lossy(&bytes[begin..end]));
    if text.chars().count() > SNIPPET_LEN {
        let mut truncated: String = text.chars().take(SNIPPET_LEN).collect();
        truncated.push_str("...");
        truncated
    } else {
        text
    }
}

fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn format_assembly(out: &mut String, asm: &Value, prefix: &str, source: Option<&str>) {
    let asm = match asm {
        Value::Object(asm) => asm,
        other => {
            let _ = writeln!(out, "{}{}", prefix, display(Some(other)));
            return;
        }
    };

    let _ = writeln!(out, "{}.code", prefix);
    for item in asm.get(".code").and_then(Value::as_array).into_iter().flatten() {
        let name = display(item.get("name"));
        if name != "tag" {
            out.push_str("  ");
        }
        let _ = writeln!(
            out,
            "{}{} {}\t\t\t{}",
            prefix,
            name,
            display(item.get("value")),
            snippet(source, item)
        );
    }

    let _ = writeln!(out, "{}.data", prefix);
    if let Some(data) = asm.get(".data").and_then(Value::as_object) {
        let mut keys: Vec<&String> = data.keys().collect();
        // sub-assemblies are keyed by index; keep them in numeric order
        keys.sort_by_key(|k| (k.parse::<u64>().unwrap_or(u64::MAX), k.to_string()));
        for key in keys {
            let _ = writeln!(out, "  {}{}:", prefix, key);
            format_assembly(out, &data[key.as_str()], &format!("{}    ", prefix), source);
        }
    }
}

/// Render a legacy JSON assembly tree as the compiler's textual assembly listing.
///
/// When `source` is given, each instruction is annotated with the (escaped, truncated) source
/// text it was generated from.
pub fn pretty_print_legacy_assembly_json(assembly: &Value, source: Option<&str>) -> String {
    let mut out = String::new();
    format_assembly(&mut out, assembly, "", source);
    out
}
