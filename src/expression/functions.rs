//! Built-in function table

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    /// Two or more
    Variadic,
}

impl Arity {
    /// Diagnostic for a call with `got` arguments, if that count is wrong
    pub fn check(self, name: &str, got: usize) -> Option<String> {
        match self {
            Arity::Exactly(expected) if expected != got => Some(format!(
                "Function '{}' expects {} argument{}, but got {}",
                name,
                expected,
                if expected == 1 { "" } else { "s" },
                got
            )),
            Arity::Variadic if got < 2 => Some(format!(
                "Function '{}' expects at least 2 arguments, but got {}",
                name, got
            )),
            _ => None,
        }
    }
}

/// Arity of a known function; `name` must already be lowercase
pub fn lookup(name: &str) -> Option<Arity> {
    let arity = match name {
        "if" => Arity::Exactly(3),
        "max" | "min" | "sum" | "mean" => Arity::Variadic,
        "abs" | "sqrt" | "sin" | "cos" | "tan" | "asin" | "acos" | "atan" | "sinh" | "cosh"
        | "tanh" | "ln" | "log" | "log10" | "exp" | "ceil" | "floor" | "round" => {
            Arity::Exactly(1)
        }
        "pow" | "atan2" => Arity::Exactly(2),
        _ => return None,
    };
    Some(arity)
}

/// Known function for a common misspelling
pub fn suggestion(name: &str) -> Option<&'static str> {
    match name {
        "maximum" => Some("max"),
        "minimum" => Some("min"),
        "average" => Some("mean"),
        "square_root" => Some("sqrt"),
        "logarithm" => Some("log"),
        "power" => Some("pow"),
        _ => None,
    }
}

/// Diagnostic for an unknown function name
pub fn unknown_function_message(name: &str) -> String {
    match suggestion(name) {
        Some(known) => format!("Unknown function: '{}' (did you mean '{}'?)", name, known),
        None => format!("Unknown function: '{}'", name),
    }
}
