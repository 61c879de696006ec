/// quick start - minimal example to get started
use savings_ledger_rs::{
    AllocationPolicy, GroupConfig, GroupLedger, Member, Money, Payment, Rate, SafeTimeProvider,
    TimeSource,
};
use savings_ledger_rs::chrono::{NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // a monthly savings group: Rs 500 per member, 12% per period on loans
    let config = GroupConfig::monthly(
        "mahila bachat gat",
        Money::from_major(500),
        Rate::from_percentage(12),
        15,
    );
    let members = vec![Member::new("asha"), Member::new("kavita")];
    let mut ledger = GroupLedger::new(
        config,
        members,
        NaiveDate::from_ymd_opt(2024, 3, 1).ok_or("bad date")?,
    )?;

    // record one member's contribution
    let period_id = ledger.current_period()?.id;
    let row_id = ledger.contributions_for(period_id)[0].id;
    ledger.record_payment(
        row_id,
        &[Payment::Compulsory(Money::from_major(500))],
        NaiveDate::from_ymd_opt(2024, 3, 14).ok_or("bad date")?,
    )?;

    // close the period, splitting collected cash 50/50
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap(),
    ));
    let outcome = ledger.close_period(period_id, &AllocationPolicy::EvenSplit, &time)?;
    println!("collected: {}", outcome.total_collected);
    println!("bank: {}  hand: {}", ledger.group.bank_balance, ledger.group.cash_in_hand);

    Ok(())
}
