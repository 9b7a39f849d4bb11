//! Definite-assignment scenarios.

use veld_ast::{AstBuilder, NodeId};
use veld_cfg::CfgBuilder;
use veld_flow::{UseBeforeInit, check_definite_assignment};
use veld_types::TypeId;

fn check(b: &AstBuilder, body: NodeId) -> Vec<UseBeforeInit> {
    let cfg = CfgBuilder::build(&b.arena, body).expect("well-formed body");
    check_definite_assignment(&b.arena, &b.symbols, &b.keys, &cfg)
}

#[test]
fn read_before_any_write_is_flagged() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeId::INT);
    let decl = b.var_decl(x, None);
    let r = b.read(x);
    let body = b.block(vec![decl, r]);

    let uses = check(&b, body);
    assert_eq!(uses, vec![UseBeforeInit { node: r, symbol: x }]);
}

#[test]
fn initializer_counts_as_a_write() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeId::INT);
    let one = b.lit(TypeId::INT);
    let decl = b.var_decl(x, Some(one));
    let r = b.read(x);
    let body = b.block(vec![decl, r]);

    assert!(check(&b, body).is_empty());
}

#[test]
fn parameters_arrive_initialized() {
    let mut b = AstBuilder::new();
    let p = b.param("p", TypeId::INT);
    let r = b.read(p);
    let body = b.block(vec![r]);

    assert!(check(&b, body).is_empty());
}

#[test]
fn assignment_on_both_branches_initializes() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeId::INT);
    let decl = b.var_decl(x, None);
    let cond = b.opaque_read(TypeId::BOOLEAN);
    let one = b.lit(TypeId::INT);
    let set_then = b.assign(x, one);
    let two = b.lit(TypeId::INT);
    let set_else = b.assign(x, two);
    let branch = b.if_(cond, set_then, Some(set_else));
    let r = b.read(x);
    let body = b.block(vec![decl, branch, r]);

    assert!(check(&b, body).is_empty());
}

#[test]
fn assignment_on_one_branch_is_not_enough() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeId::INT);
    let decl = b.var_decl(x, None);
    let cond = b.opaque_read(TypeId::BOOLEAN);
    let one = b.lit(TypeId::INT);
    let set_then = b.assign(x, one);
    let branch = b.if_(cond, set_then, None);
    let r = b.read(x);
    let body = b.block(vec![decl, branch, r]);

    let uses = check(&b, body);
    assert_eq!(uses, vec![UseBeforeInit { node: r, symbol: x }]);
}

#[test]
fn while_body_may_not_run() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeId::INT);
    let decl = b.var_decl(x, None);
    let cond = b.opaque_read(TypeId::BOOLEAN);
    let one = b.lit(TypeId::INT);
    let set = b.assign(x, one);
    let loop_body = b.block(vec![set]);
    let w = b.while_(cond, loop_body);
    let r = b.read(x);
    let body = b.block(vec![decl, w, r]);

    let uses = check(&b, body);
    assert_eq!(uses, vec![UseBeforeInit { node: r, symbol: x }]);
}

#[test]
fn do_while_body_always_runs() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeId::INT);
    let decl = b.var_decl(x, None);
    let one = b.lit(TypeId::INT);
    let set = b.assign(x, one);
    let loop_body = b.block(vec![set]);
    let cond = b.opaque_read(TypeId::BOOLEAN);
    let dw = b.do_while(loop_body, cond);
    let r = b.read(x);
    let body = b.block(vec![decl, dw, r]);

    assert!(check(&b, body).is_empty());
}

#[test]
fn write_in_a_raising_block_does_not_reach_the_catch() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeId::INT);
    let decl = b.var_decl(x, None);
    let call = b.call(None, vec![], TypeId::UNIT);
    let one = b.lit(TypeId::INT);
    let set = b.assign(x, one);
    let try_body = b.block(vec![call, set]);
    let e = b.param("e", TypeId::ANY);
    let r = b.read(x);
    let catch_body = b.block(vec![r]);
    let catch = b.catch(e, catch_body);
    let t = b.try_(try_body, vec![catch], None);
    let body = b.block(vec![decl, t]);

    let uses = check(&b, body);
    assert_eq!(uses, vec![UseBeforeInit { node: r, symbol: x }]);
}

#[test]
fn catch_parameter_is_bound_by_the_runtime() {
    let mut b = AstBuilder::new();
    let call = b.call(None, vec![], TypeId::UNIT);
    let try_body = b.block(vec![call]);
    let e = b.param("e", TypeId::ANY);
    let r = b.read(e);
    let catch_body = b.block(vec![r]);
    let catch = b.catch(e, catch_body);
    let t = b.try_(try_body, vec![catch], None);
    let body = b.block(vec![t]);

    assert!(check(&b, body).is_empty());
}

#[test]
fn closure_sees_initialization_from_its_capture_point() {
    let mut b = AstBuilder::new();
    let x = b.var("x", TypeId::INT);
    let decl_no_init = b.var_decl(x, None);
    let r_inner = b.read(x);
    let lam_body = b.block(vec![r_inner]);
    let lam = b.lambda(lam_body, veld_ast::InvocationOrder::InPlace);
    let body = b.block(vec![decl_no_init, lam]);

    let uses = check(&b, body);
    assert_eq!(
        uses,
        vec![UseBeforeInit {
            node: r_inner,
            symbol: x
        }]
    );
}
