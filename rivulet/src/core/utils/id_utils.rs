use nanoid::nanoid;
use rand::{Rng, distr::Alphanumeric, rng};

pub const JOIN_CODE_LEN: usize = 6;

/// Codes are stored uppercase; resolving a join canonicalizes the input with
/// the same rule, which makes code lookup case-insensitive.
pub fn canonical_join_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

pub fn generate_join_code() -> String {
    let mut rng = rng();

    let mut code = String::with_capacity(JOIN_CODE_LEN);
    while code.len() < JOIN_CODE_LEN {
        let c = (rng.sample(Alphanumeric) as char).to_ascii_uppercase();
        code.push(c);
    }
    code
}

pub fn generate_object_key() -> String {
    nanoid!(12)
}
