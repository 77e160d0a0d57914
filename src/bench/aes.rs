//! AES round-trip test.
//!
//! The plaintext is encrypted, and the ciphertext is fed back through the
//! core with the same key. The test passes when this returns the plaintext,
//! which holds for the XOR cipher implemented by the FPGA core.

use super::log_failure;
use crate::config::BenchConfig;
use crate::soc::Soc;
use anyhow::Result;
use rxchain_json::AesTest;
use tokio::io::{AsyncRead, AsyncWrite};

/// Runs the AES round-trip test.
#[tracing::instrument(name = "aes", level = "info", skip_all)]
pub async fn run<S: AsyncRead + AsyncWrite + Unpin>(
    soc: &mut Soc<S>,
    config: &BenchConfig,
) -> AesTest {
    let key = config.aes_key;
    let plaintext = config.aes_plaintext;
    tracing::info!("writing key and plaintext");
    log_failure(soc.aes_set_key(&key).await);

    let ciphertext = match run_block(soc, config, &plaintext).await {
        Ok(block) => block,
        Err(err) => {
            tracing::warn!("AES test FAIL: {err:#}");
            return AesTest {
                key,
                plaintext,
                ciphertext: None,
                decrypted: None,
                pass: false,
            };
        }
    };
    tracing::info!("ciphertext: {}", format_block(&ciphertext));

    tracing::info!("feeding ciphertext back");
    let decrypted = run_block(soc, config, &ciphertext)
        .await
        .map_err(|err| tracing::warn!("AES decrypt FAIL: {err:#}"))
        .ok();
    let pass = decrypted == Some(plaintext);
    if let Some(decrypted) = &decrypted {
        tracing::info!("decrypted: {}", format_block(decrypted));
        if pass {
            tracing::info!("AES round trip PASS");
        } else {
            tracing::warn!("AES round trip FAIL: decrypted block does not match plaintext");
        }
    }
    AesTest {
        key,
        plaintext,
        ciphertext: Some(ciphertext),
        decrypted,
        pass,
    }
}

// Runs the core on one input block and reads its output.
async fn run_block<S: AsyncRead + AsyncWrite + Unpin>(
    soc: &mut Soc<S>,
    config: &BenchConfig,
    input: &[u32; 4],
) -> Result<[u32; 4]> {
    log_failure(soc.aes_set_plaintext(input).await);
    log_failure(soc.aes_start().await);
    tokio::time::sleep(config.aes_delay()).await;
    soc.aes_ciphertext().await
}

fn format_block(block: &[u32; 4]) -> String {
    block
        .iter()
        .map(|word| format!("{word:08x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
