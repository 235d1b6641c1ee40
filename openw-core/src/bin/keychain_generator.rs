use std::{env, fs::File};

use openw_core::{keychain::Keychain, utils::Saveable};

fn main() {
    let name = env::args().nth(1).expect("Please provide a name");

    let keychain = Keychain::generate();

    let public_key_file = name.clone() + ".pub.json";
    let keychain_file = name + ".keychain.json";

    let keychain_file = File::create(&keychain_file).expect("Failed to create keychain file");
    keychain
        .save(keychain_file)
        .expect("Failed to save keychain");

    let public_key_file = File::create(&public_key_file).expect("Failed to create public key file");
    keychain
        .public_key()
        .save(public_key_file)
        .expect("Failed to save public key");

    println!("node id: {}", keychain.node_id());
}
