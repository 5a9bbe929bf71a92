// Macros used in the crate.

/// A simple shortcut for ensuring a type is send and sync.
///
/// For most types just call it after defining the type:
///
/// ```ignore
/// pub struct MyStruct {}
/// assert_send_and_sync!(MyStruct);
/// ```
macro_rules! assert_send_and_sync {
    ( $x:ty where $( $g:ident : $b:path ),+ $(,)? ) => {
        impl<$( $g ),+> crate::types::Sendable for $x
            where $( $g: $b + Send + Sync ),+
        {}
        impl<$( $g ),+> crate::types::Syncable for $x
            where $( $g: $b + Send + Sync ),+
        {}
    };
    ( $x:ty ) => {
        impl crate::types::Sendable for $x {}
        impl crate::types::Syncable for $x {}
    };
}

/// Like assert!, but checks a pattern.
///
///   assert_match!(Some(_) = x);
#[allow(unused_macros)]
macro_rules! assert_match {
    ( $error: pat = $expr:expr, $fmt:expr, $($pargs:expr),* ) => {{
        let x = $expr;
        if let $error = x {
            /* Pass.  */
        } else {
            let extra = format!($fmt, $($pargs),*);
            panic!("Expected {}, got {:?}{}{}",
                   stringify!($error), x,
                   if $fmt.len() > 0 { ": " } else { "." }, extra);
        }
    }};
    ( $error: pat = $expr: expr, $fmt:expr ) => {
        assert_match!($error = $expr, $fmt, );
    };
    ( $error: pat = $expr: expr ) => {
        assert_match!($error = $expr, "");
    };
}

/// Conditionally prints a message to stderr.
///
/// The first argument is a boolean (typically the function's local
/// `TRACE` constant), the rest are passed to `eprintln!`.
#[allow(unused_macros)]
macro_rules! trace {
    ( $TRACE:expr, $fmt:expr, $($pargs:expr),* ) => {
        if $TRACE {
            eprintln!($fmt, $($pargs),*);
        }
    };
    ( $TRACE:expr, $fmt:expr ) => {
        trace!($TRACE, $fmt, );
    };
}

/// Defines a local `t!` macro gated on the given boolean.
///
/// Typical use:
///
/// ```ignore
/// fn parse(...) {
///     tracer!(TRACE, "parse");
///     t!("parsing a {:?}", tag);
/// }
/// ```
#[allow(unused_macros)]
macro_rules! tracer {
    ( $TRACE:expr, $func:expr ) => {
        // Currently, Rust doesn't support $( ... ) in a nested
        // macro's definition.  See:
        // https://users.rust-lang.org/t/nested-macros-issue/8348/2
        #[allow(unused_macros)]
        macro_rules! t {
            ( $fmt:expr ) =>
            ( trace!($TRACE, "{}: {}", $func, $fmt) );
            ( $fmt:expr, $a:expr ) =>
            ( trace!($TRACE, "{}: {}", $func, format!($fmt, $a)) );
            ( $fmt:expr, $a:expr, $b:expr ) =>
            ( trace!($TRACE, "{}: {}", $func, format!($fmt, $a, $b)) );
            ( $fmt:expr, $a:expr, $b:expr, $c:expr ) =>
            ( trace!($TRACE, "{}: {}", $func, format!($fmt, $a, $b, $c)) );
            ( $fmt:expr, $a:expr, $b:expr, $c:expr, $d:expr ) =>
            ( trace!($TRACE, "{}: {}", $func, format!($fmt, $a, $b, $c, $d)) );
        }
    }
}
