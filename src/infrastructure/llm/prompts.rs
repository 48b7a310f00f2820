// src/infrastructure/llm/prompts.rs
// Prompt construction for trading analysis.

use crate::analysis::IndicatorSet;
use crate::domain::models::MarketSnapshot;

/// Build the trading analysis prompt. The output schema in the prompt must
/// stay in sync with `TradeAnalysis`.
pub fn trading_analysis_prompt(
    snapshot: &MarketSnapshot,
    indicators: &IndicatorSet,
    context: Option<&serde_json::Value>,
) -> String {
    let market_cap = snapshot
        .market_cap
        .map(|v| format!("${:.0}", v))
        .unwrap_or_else(|| "N/A".to_string());
    let liquidity = snapshot
        .liquidity_usd
        .map(|v| format!("${:.0}", v))
        .unwrap_or_else(|| "N/A".to_string());

    let indicators_json =
        serde_json::to_string_pretty(indicators).unwrap_or_else(|_| "{}".to_string());
    let context_json = context
        .map(|c| serde_json::to_string_pretty(c).unwrap_or_else(|_| "{}".to_string()))
        .unwrap_or_else(|| "{}".to_string());

    format!(
        r#"You are an expert cryptocurrency trading analyst specializing in Solana tokens. Analyze the following market data and provide a trading recommendation.

## Token Information
- Symbol: {symbol}
- Current Price: ${price:.6}
- 24h Volume: ${volume:.2}
- 24h Price Change: {change:+.2}%
- Market Cap: {market_cap}
- Liquidity: {liquidity}

## Technical Indicators
```json
{indicators}
```

## Additional Context
```json
{context}
```

## Analysis Instructions

1. **Trend Analysis**: Evaluate the overall trend based on price action and technical indicators
2. **Momentum**: Assess momentum indicators (RSI, MACD) to determine strength
3. **Support/Resistance**: Identify key support and resistance levels
4. **Volume Analysis**: Consider trading volume and liquidity
5. **Risk Assessment**: Evaluate the risk level of trading this token

## Trading Guidelines

- Be conservative with new or low-liquidity tokens
- Prefer trades with strong technical confirmation
- Always consider risk/reward ratio
- Set appropriate stop losses (typically 5-15%)
- Set take profit targets (typically 10-30%)

## Required Output Format

Provide your analysis as a JSON object with these fields:

```json
{{
  "action": "buy | sell | hold",
  "strength": "very_weak | weak | moderate | strong | very_strong",
  "confidence": 0.0-1.0,
  "risk_level": "low | medium | high",
  "reasoning": "Your detailed analysis explaining the recommendation",
  "entry_price": null or suggested entry price,
  "stop_loss": null or suggested stop loss price,
  "take_profit": null or suggested take profit price,
  "position_size_percent": null or recommended position size as percentage of portfolio (1-5% typical)
}}
```

## Important Considerations

- If uncertainty is high, recommend "hold" with low confidence
- For low liquidity tokens, increase risk assessment
- Consider the overall market conditions
- Factor in the 24h price trend
- Use technical indicators to confirm decisions
- Be realistic about potential gains and losses

Provide ONLY the JSON object, no additional text."#,
        symbol = snapshot.token_symbol,
        price = snapshot.price,
        volume = snapshot.volume_24h,
        change = snapshot.price_change_24h,
        market_cap = market_cap,
        liquidity = liquidity,
        indicators = indicators_json,
        context = context_json,
    )
}
