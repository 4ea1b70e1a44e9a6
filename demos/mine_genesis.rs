// Mine a genesis block and its successor on all CPU cores

use pow_miner::{Block, Miner};

fn main() {
    env_logger::init();
    println!("Mining genesis block...\n");

    let miner = Miner::new(5);
    let mut genesis = Block::genesis(1231006505);

    let result = match miner.mine_parallel(&mut genesis, None) {
        Ok(r) => r,
        Err(e) => {
            println!("✗ Mining failed: {}", e);
            return;
        }
    };

    println!("✓ Genesis block mined successfully!\n");
    println!("Nonce: {}", result.nonce);
    println!("Hash: {}", result.hash);
    println!("Attempts: {}", result.attempts);
    println!("Workers: {}", result.workers);
    println!("Duration: {:?}", result.duration);
    println!("Hash rate: {:.2} H/s", result.hash_rate());

    let mut next = match genesis.next(genesis.header.timestamp + 600) {
        Ok(b) => b,
        Err(e) => {
            println!("✗ {}", e);
            return;
        }
    };
    match miner.mine(&mut next) {
        Ok(r) => println!("\nBlock #1 (sequential): nonce {} hash {}", r.nonce, r.hash),
        Err(e) => println!("✗ Mining block #1 failed: {}", e),
    }
}
