//! Prompt construction for the explanation loop.

use crate::core::{PromptContribution, TransactionData};
use crate::llm::ChatMessage;

/// Static formatting rules and worked examples.
pub const SYSTEM_PROMPT: &str = "\
You explain blockchain transactions to non-experts in one or two short sentences.

Rules:
- Describe what happened, not how the EVM executed it.
- Use token symbols and human-readable amounts when they are known.
- Name protocols and well-known addresses when they are known.
- Never invent amounts, tokens, protocols or names. Omit anything you do not know.
- Do not use markdown, lists or headings. Write plain prose.
- If the transaction failed, say so first.

You can look up facts you do not have:
- search_protocols(query): DeFi protocols and applications
- search_tokens(address_or_symbol): token contracts
- search_addresses(address): routers, exchanges, bridges and other well-known addresses
Only search when the context below lacks something you need.

Examples:
- Swapped 1,000 USDC for 0.41 WETH on Uniswap V3.
- Sent 0.5 ETH to vitalik.eth.
- Approved the Uniswap Permit2 contract to spend unlimited USDC.
- Failed attempt to mint an NFT from the Pudgy Penguins collection.";

/// Sent after tool results to request the final answer.
pub const FINAL_ANSWER_INSTRUCTION: &str = "\
Using the search results above and the transaction context, write the final \
explanation now. Do not call any more functions.";

/// Builds the user message from the stage contexts.
#[must_use]
pub fn user_prompt(tx: Option<&TransactionData>, contexts: &[PromptContribution]) -> String {
    let mut prompt = String::from("Explain this transaction.");
    if let Some(tx) = tx {
        prompt.push_str(&format!("\n\nHash: {}\nNetwork id: {}", tx.hash, tx.network_id));
    }
    for contribution in contexts {
        prompt.push_str(&format!(
            "\n\n## {}\n{}",
            contribution.stage, contribution.context
        ));
    }
    prompt
}

/// The opening conversation: system rules plus the transaction context.
#[must_use]
pub fn initial_messages(
    tx: Option<&TransactionData>,
    contexts: &[PromptContribution],
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_prompt(tx, contexts)),
    ]
}
