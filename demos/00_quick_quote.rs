/// quick quote - price a loan the way the request form does
use shiftbox_loan_sim::{
    compute_quote, quote_for_profile, quote_from_form, suggested_installment_options,
    CreditProfile, LoanPurpose, Money, ProductConfig, RiskLevel,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ProductConfig::shiftbox();

    // R$ 10,000 over 12 months at the product rates
    let quote = compute_quote(Money::from_major(10_000), 12, &config.rates);
    println!("{}", quote.to_json_pretty()?);

    // one line per suggested installment count
    println!("\ninstallments  monthly payment  total repayment");
    for &count in suggested_installment_options() {
        let quote = compute_quote(Money::from_major(10_000), count, &config.rates);
        println!(
            "{:>12}  {:>15}  {:>15}",
            count,
            quote.monthly_payment.format_currency(&config.currency_symbol),
            quote.total_repayment.format_currency(&config.currency_symbol)
        );
    }

    // form input is parsed leniently; junk gives an invalid quote, not an error
    let from_form = quote_from_form("2500,50", "6", &config.rates);
    println!("\n2500,50 over 6: valid={} payment={}", from_form.valid, from_form.monthly_payment.round_cents());
    let junk = quote_from_form("abc", "6", &config.rates);
    println!("abc over 6: valid={}", junk.valid);

    // risk-tiered pricing: purpose sets the base rate, the credit band scales it
    println!("\nrisk band   monthly rate  payment (12x)  approval odds");
    for risk in [Some(RiskLevel::Excellent), Some(RiskLevel::Fair), Some(RiskLevel::VeryPoor), None] {
        let profile = CreditProfile::new(LoanPurpose::WorkingCapital, risk);
        let quote = quote_for_profile(Money::from_major(10_000), 12, &config.rates, &profile);
        println!(
            "{:<10}  {:>12}  {:>13}  {:>12}%",
            risk.map(|r| format!("{:?}", r)).unwrap_or_else(|| "unscored".to_string()),
            quote.monthly_rate,
            quote.monthly_payment.format_currency(&config.currency_symbol),
            profile.approval_probability()
        );
    }

    Ok(())
}
