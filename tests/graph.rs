//! End-to-end tests for the plain (non-nested, non-async) graph surface.

use dflow::{Callable, DflowError, Dflow, Pipe, Pin};
use std::rc::Rc;

fn sync(f: impl Fn(&[Option<dflow::Value>], Option<&dflow::callable::Receiver>) -> Result<dflow::Value, String> + 'static) -> Callable {
    Callable::Sync(Rc::new(f))
}

#[test]
fn math_pi_into_math_sin() {
    let mut g = Dflow::new("test");
    g.set_func("Math.PI", sync(|_, _| Ok((std::f64::consts::PI).into())), None, 0)
        .unwrap();
    g.set_func(
        "Math.sin",
        sync(|args, _| {
            let x = args[0].as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0);
            Ok(x.sin().into())
        }),
        None,
        1,
    )
    .unwrap();

    let id1 = g.add_node("Math.PI", "id1");
    let id2 = g.add_node("Math.sin", "id2");
    g.add_pipe(Pipe::new(Pin::new(id1.clone()), Pin::new(id2.clone())))
        .unwrap();

    g.run().unwrap();

    let pi = g.output(&id1).unwrap().as_f64().unwrap();
    let sin_pi = g.output(&id2).unwrap().as_f64().unwrap();
    assert!((pi - std::f64::consts::PI).abs() < 1e-12);
    assert!((sin_pi - std::f64::consts::PI.sin()).abs() < 1e-12);
}

#[test]
fn two_argument_sum() {
    let mut g = Dflow::new("test");
    g.set_func("PI", sync(|_, _| Ok(std::f64::consts::PI.into())), None, 0)
        .unwrap();
    g.set_func("E", sync(|_, _| Ok(std::f64::consts::E.into())), None, 0)
        .unwrap();
    g.set_func(
        "sum",
        sync(|args, _| {
            let a = args[0].as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0);
            let b = args[1].as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0);
            Ok((a + b).into())
        }),
        Some(vec!["a".into(), "b".into()]),
        2,
    )
    .unwrap();

    let id1 = g.add_node("PI", "id1");
    let id2 = g.add_node("E", "id2");
    let id3 = g.add_node("sum", "id3");
    g.add_pipe(Pipe::new(Pin::new(id1), Pin::at(id3.clone(), 0))).unwrap();
    g.add_pipe(Pipe::new(Pin::new(id2), Pin::at(id3.clone(), 1))).unwrap();

    g.run().unwrap();

    let sum = g.output(&id3).unwrap().as_f64().unwrap();
    assert!((sum - (std::f64::consts::PI + std::f64::consts::E)).abs() < 1e-12);
}

#[test]
fn broken_pipe_names_the_offending_pipe() {
    let mut g = Dflow::new("test");
    g.add_node("whatever", "nodeId");
    let pipe = Pipe::new(Pin::new("missing"), Pin::new("nodeId"));
    let err = g.add_pipe(pipe.clone()).unwrap_err();
    assert_eq!(err, DflowError::BrokenPipe { pipe });
}

#[test]
fn name_override_throws_on_the_second_binding() {
    let mut g = Dflow::new("test");
    g.set_func("f", sync(|_, _| Ok(dflow::Value::Null)), None, 0).unwrap();
    let err = g
        .set_func("f", sync(|_, _| Ok(dflow::Value::Null)), None, 0)
        .unwrap_err();
    assert_eq!(
        err,
        DflowError::NodeOverride {
            node_name: "f".to_string()
        }
    );
}

#[test]
fn unknown_name_is_a_silent_no_op() {
    let mut g = Dflow::new("test");
    let id = g.add_node("neverBound", "id1");
    g.run().unwrap();
    assert!(g.output(&id).is_none());
}
