#[macro_export]
macro_rules! assert_err {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            Err(e) => e,
            actual => {
                use std::fmt::Write;
                let mut msg = format!("expected `Err`; actual={:?}", actual);

                $(
                    write!(msg, ", ").unwrap();
                    write!(msg, $($t)*).unwrap();
                )?

                panic!("{}", msg);
            }
        }
    };
}

#[macro_export]
macro_rules! assert_none {
    ($e:expr) => {
        match $e {
            None => {}
            actual => panic!("expected `None`; actual={:?}", actual),
        }
    };
}

/// Ids of `records`, in order.
#[macro_export]
macro_rules! ids {
    ($records:expr) => {
        $records
            .iter()
            .map(|record| record.get("id").and_then(|id| id.as_i64()).unwrap())
            .collect::<Vec<i64>>()
    };
}
