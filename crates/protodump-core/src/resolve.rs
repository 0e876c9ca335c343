//! Shortest in-scope spelling of fully qualified type references.
//!
//! Descriptors store message and enum references fully qualified with a
//! leading dot (`.pkg.Outer.Inner`). Inside `package pkg; message Outer`
//! the reference can be written as `Inner`, and the renderer wants that.

/// Resolves `reference` against the lexical scope it is written in.
///
/// `namespace` lists the enclosing package components and message names,
/// outermost first, not including `enclosing`, the message whose body holds
/// the reference (empty at file scope).
///
/// References without a leading `.` are returned unchanged. Otherwise leading
/// components are dropped while they match consecutive `namespace` entries,
/// stopping at the first mismatch, then one more if it names `enclosing`. A
/// reference that resolves to nothing is the enclosing message itself.
pub fn resolve_type_name(reference: &str, namespace: &[&str], enclosing: &str) -> String {
    let Some(qualified) = reference.strip_prefix('.') else {
        return reference.to_string();
    };

    let components: Vec<&str> = qualified.split('.').collect();
    let mut rest = components.as_slice();

    for scope in namespace {
        match rest.split_first() {
            Some((first, tail)) if first == scope => rest = tail,
            _ => break,
        }
    }

    // `.pkg.M.M` when M nests a type also named M
    if let Some((first, tail)) = rest.split_first() {
        if *first == enclosing {
            rest = tail;
        }
    }

    if rest.is_empty() {
        enclosing.to_string()
    } else {
        rest.join(".")
    }
}

/// Splits a package name into namespace components
pub fn package_namespace(package: &str) -> Vec<&str> {
    package.split('.').filter(|part| !part.is_empty()).collect()
}
