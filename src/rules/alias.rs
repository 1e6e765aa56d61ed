//! Long-form framework type names and their built-in keyword aliases.

const ALIASES: [(&str, &str); 15] = [
    ("Boolean", "bool"),
    ("Byte", "byte"),
    ("Char", "char"),
    ("Decimal", "decimal"),
    ("Double", "double"),
    ("Int16", "short"),
    ("Int32", "int"),
    ("Int64", "long"),
    ("Object", "object"),
    ("SByte", "sbyte"),
    ("Single", "float"),
    ("String", "string"),
    ("UInt16", "ushort"),
    ("UInt32", "uint"),
    ("UInt64", "ulong"),
];

/// Namespace qualifiers stripped before lookup, outermost first.
const QUALIFIERS: [&str; 2] = ["global::", "System."];

/// Map a matched type name (`Int32`, `System.Int32`, `global::System.Int32`)
/// to its keyword alias.
pub fn builtin_alias(matched: &str) -> Option<&'static str> {
    let mut name = matched.trim();
    for qualifier in QUALIFIERS {
        name = name.strip_prefix(qualifier).unwrap_or(name);
    }

    ALIASES
        .iter()
        .find(|(long, _)| *long == name)
        .map(|(_, alias)| *alias)
}
