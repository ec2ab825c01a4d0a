//! Signatures of the functions preinstalled in the root scope: `print/1`
//! always, `logarithm/1` and `converter/2` as the optional numeric
//! built-ins. Shared between the analyzer (which only needs the signatures
//! to type-check calls) and the interpreter (which also attaches a native
//! body).
use crate::types::Type;

pub struct Signature {
    pub name: &'static str,
    pub param_types: &'static [Type],
    pub return_type: Type,
}

pub fn signatures() -> Vec<Signature> {
    vec![
        Signature {
            name: "print",
            param_types: &[Type::Any],
            return_type: Type::Nil,
        },
        Signature {
            name: "logarithm",
            param_types: &[Type::Decimal],
            return_type: Type::Decimal,
        },
        Signature {
            name: "converter",
            param_types: &[Type::Integer, Type::Integer],
            return_type: Type::String,
        },
    ]
}
