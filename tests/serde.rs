//! End-to-end tests for the summary string and the persistence format.

use dflow::serde_format;
use dflow::{Callable, Dflow, Pipe, Pin};
use std::rc::Rc;

#[test]
fn summary_reports_shape_counts() {
    let mut g = Dflow::new("test");
    g.set_func("Math.sin", Callable::Sync(Rc::new(|_, _| Ok(dflow::Value::Null))), Some(vec!["arg".into()]), 1)
        .unwrap();
    g.set_func("Math.PI", Callable::Sync(Rc::new(|_, _| Ok(dflow::Value::Null))), None, 0)
        .unwrap();
    let a = g.add_node("Math.PI", "a");
    let b = g.add_node("Math.sin", "b");
    g.add_pipe(Pipe::new(Pin::new(a), Pin::new(b))).unwrap();

    assert_eq!(g.summary(), "Dflow name=test args=0 nodes=2 pipes=1 outs=0");
}

#[test]
fn serialization_is_idempotent() {
    let mut g = Dflow::new("g");
    g.add_node("f", "a");
    g.add_node("f", "b");
    g.add_pipe(Pipe::new(Pin::new("a"), Pin::new("b"))).unwrap();

    let first = serde_format::to_value(&g).unwrap();
    let restored = serde_format::from_value(first.clone()).unwrap();
    let second = serde_format::to_value(&restored).unwrap();

    assert_eq!(first, second);
}
