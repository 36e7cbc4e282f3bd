mod common;

use common::*;
use instalock_consensus::{LockConfig, LockRequest, RequestRejection};
use instalock_types::{Amount, Transaction, TxIn, TxOut};

#[test]
fn well_formed_request_is_valid() {
    let env = env();
    fund(&env, input(1));
    fund(&env, input(2));
    let req = request(&[input(1), input(2)], 0);
    assert_eq!(req.validate(&*env.chain, &config()), Ok(()));
}

#[test]
fn request_without_outputs_rejected() {
    let env = env();
    fund(&env, input(1));
    let req = LockRequest::new(Transaction::new(vec![TxIn::new(input(1))], vec![]));
    assert_eq!(
        req.validate(&*env.chain, &config()),
        Err(RequestRejection::NoOutputs)
    );
}

#[test]
fn non_final_request_rejected() {
    let env = env();
    fund(&env, input(1));
    let req = request(&[input(1)], 0);
    env.chain.mark_non_final(req.hash());
    assert_eq!(
        req.validate(&*env.chain, &config()),
        Err(RequestRejection::NotFinal)
    );
}

#[test]
fn spent_input_rejected() {
    let env = env();
    fund(&env, input(1));
    let req = request(&[input(1), input(2)], 0);
    assert_eq!(
        req.validate(&*env.chain, &config()),
        Err(RequestRejection::MissingInput(input(2)))
    );
}

#[test]
fn input_age_floor_is_one_below_confirmations() {
    let env = env();
    // age = tip - height + 1; five confirmations are enough
    env.chain.add_utxo(input(1), TIP - 4, Amount::new(COIN));
    env.chain.add_utxo(input(2), TIP - 3, Amount::new(COIN));

    assert_eq!(
        request(&[input(1)], 0).validate(&*env.chain, &config()),
        Ok(())
    );
    assert_eq!(
        request(&[input(2)], 0).validate(&*env.chain, &config()),
        Err(RequestRejection::InputTooNew {
            outpoint: input(2),
            age: 4,
            required: 5,
        })
    );
}

#[test]
fn value_ceiling_enforced() {
    let env = env();
    fund(&env, input(1));
    fund(&env, input(2));
    let config = LockConfig {
        max_value_coins: 1,
        ..config()
    };
    assert_eq!(request(&[input(1)], 0).validate(&*env.chain, &config), Ok(()));
    assert_eq!(
        request(&[input(1), input(2)], 0).validate(&*env.chain, &config),
        Err(RequestRejection::ValueTooHigh {
            value: Amount::new(2 * COIN),
            max: Amount::new(COIN),
        })
    );
}

#[test]
fn fee_floor_scales_with_inputs() {
    let env = env();
    fund(&env, input(1));
    fund(&env, input(2));
    let inputs = [input(1), input(2)];

    assert_eq!(
        request_with_fee(&inputs, 20_000, 0).validate(&*env.chain, &config()),
        Ok(())
    );
    assert_eq!(
        request_with_fee(&inputs, 19_999, 0).validate(&*env.chain, &config()),
        Err(RequestRejection::InsufficientFee {
            fee: Amount::new(19_999),
            min: Amount::new(20_000),
        })
    );
}

#[test]
fn outputs_above_inputs_count_as_zero_fee() {
    let env = env();
    fund(&env, input(1));
    let req = LockRequest::new(Transaction::new(
        vec![TxIn::new(input(1))],
        vec![TxOut::new(Amount::new(2 * COIN), vec![])],
    ));
    assert_eq!(
        req.validate(&*env.chain, &config()),
        Err(RequestRejection::InsufficientFee {
            fee: Amount::ZERO,
            min: Amount::new(10_000),
        })
    );
}

#[test]
fn derived_limits() {
    let req = request(&[input(1), input(2), input(3)], 0);
    let params = config().params;
    assert_eq!(req.min_fee(&params), Amount::new(30_000));
    assert_eq!(req.max_signatures(&params), 30);
}
