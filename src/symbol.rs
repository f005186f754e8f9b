//! Probe symbol extraction
//!
//! Finds the label that defines the probe function in compiler assembly and
//! turns it into a suffix. With the Itanium ABI the label for
//! `void foo(int)` is `_Z3fooi:`, and the suffix is the symbol with the
//! length-prefixed name `3foo` removed: `_Zi`.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Encoded probe name (length prefix + name)
const ENCODED_NAME: &str = "3foo";

fn label_regex() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| Regex::new(r"(_Z3foo.*):").expect("probe label pattern is valid"))
}

/// First probe-function label in the assembly, without the trailing colon.
///
/// Matching is per line and greedy up to the last colon on that line, which
/// is how the definition label reads in both GNU and LLVM output. Platforms
/// that prefix C symbols with an underscore (`__Z3fooi:`) still match.
pub fn find_probe_symbol(assembly: &str) -> Option<&str> {
    label_regex()
        .captures(assembly)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Remove the first occurrence of the encoded probe name.
pub fn strip_probe_name(symbol: &str) -> String {
    symbol.replacen(ENCODED_NAME, "", 1)
}

/// Suffix for the probe function defined in `assembly`, if any.
pub fn extract_suffix(assembly: &str) -> Option<String> {
    find_probe_symbol(assembly).map(strip_probe_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GCC_OUTPUT: &str = r#"	.file	"<stdin>"
	.text
	.globl	_Z3fooi
	.type	_Z3fooi, @function
_Z3fooi:
.LFB0:
	.cfi_startproc
	pushq	%rbp
	ret
	.cfi_endproc
.LFE0:
	.size	_Z3fooi, .-_Z3fooi
	.ident	"GCC: (GNU) 13.2.0"
"#;

    const CLANG_OUTPUT: &str = r#"	.text
	.file	"-"
	.globl	_Z3fooic                        # -- Begin function _Z3fooic
	.p2align	4, 0x90
	.type	_Z3fooic,@function
_Z3fooic:                               # @_Z3fooic
	.cfi_startproc
	retq
"#;

    #[test]
    fn test_gcc_label() {
        assert_eq!(find_probe_symbol(GCC_OUTPUT), Some("_Z3fooi"));
        assert_eq!(extract_suffix(GCC_OUTPUT).as_deref(), Some("_Zi"));
    }

    #[test]
    fn test_clang_label_with_trailing_comment() {
        assert_eq!(find_probe_symbol(CLANG_OUTPUT), Some("_Z3fooic"));
        assert_eq!(extract_suffix(CLANG_OUTPUT).as_deref(), Some("_Zic"));
    }

    #[test]
    fn test_darwin_underscore_prefix() {
        let asm = "\t.globl\t__Z3foov\n__Z3foov:\n\tret\n";
        assert_eq!(extract_suffix(asm).as_deref(), Some("_Zv"));
    }

    #[test]
    fn test_no_label() {
        assert_eq!(find_probe_symbol(""), None);
        assert_eq!(extract_suffix("\t.globl\t_Z3fooi\n\t.type\t_Z3fooi, @function\n"), None);
    }

    #[test]
    fn test_other_functions_ignored() {
        let asm = "_Z3bari:\n\tret\n_Z3foodd:\n\tret\n";
        assert_eq!(extract_suffix(asm).as_deref(), Some("_Zdd"));
    }

    #[test]
    fn test_strip_only_first_name() {
        // void foo(foo): a parameter of class type `foo` also encodes as `3foo`.
        assert_eq!(strip_probe_name("_Z3foo3foo"), "_Z3foo");
    }
}
