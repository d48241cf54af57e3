    use super::*;
    use chrono::TimeZone;

    fn cron_of(builder: ScheduleBuilder) -> String {
        builder
            .to_config()
            .unwrap()
            .cron()
            .map(|c| c.as_str().to_string())
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_presets_default_to_midnight() {
        assert_eq!(cron_of(ScheduleBuilder::new().daily()), "0 0 * * *");
        assert_eq!(cron_of(ScheduleBuilder::new().weekly(Weekday::Sun)), "0 0 * * 0");
        assert_eq!(cron_of(ScheduleBuilder::new().weekly(Weekday::Sat)), "0 0 * * 6");
        assert_eq!(cron_of(ScheduleBuilder::new().monthly(15).unwrap()), "0 0 15 * *");
        assert_eq!(cron_of(ScheduleBuilder::new().yearly(25, 12).unwrap()), "0 0 25 12 *");
    }

    #[test]
    fn test_at_applies_to_presets() {
        let builder = ScheduleBuilder::new().weekly_on("wed").unwrap().at("09:15").unwrap();
        assert_eq!(cron_of(builder), "15 9 * * 3");
    }

    #[test]
    fn test_custom_cron_ignores_at() {
        let builder = ScheduleBuilder::new()
            .custom_cron("*/5 * * * *")
            .unwrap()
            .at("12:00")
            .unwrap();
        assert_eq!(cron_of(builder), "*/5 * * * *");
    }

    #[test]
    fn test_last_recurrence_wins() {
        let builder = ScheduleBuilder::new().daily().monthly(3).unwrap().weekly(Weekday::Mon);
        assert_eq!(cron_of(builder), "0 0 * * 1");
        assert_eq!(
            ScheduleBuilder::new().weekly(Weekday::Mon).daily().recurrence(),
            Some(&Recurrence::Daily)
        );
    }

    #[test]
    fn test_range_validation() {
        assert_eq!(
            ScheduleBuilder::new().monthly(0).unwrap_err(),
            ScheduleValidationError::DayOfMonthOutOfRange(0)
        );
        assert_eq!(
            ScheduleBuilder::new().monthly(32).unwrap_err(),
            ScheduleValidationError::DayOfMonthOutOfRange(32)
        );
        assert_eq!(
            ScheduleBuilder::new().yearly(1, 13).unwrap_err(),
            ScheduleValidationError::MonthOutOfRange(13)
        );
        assert!(ScheduleBuilder::new().yearly(31, 12).is_ok());
        assert!(matches!(
            ScheduleBuilder::new().weekly_on("someday").unwrap_err(),
            ScheduleValidationError::InvalidDayOfWeek(_)
        ));
    }

    #[test]
    fn test_time_of_day_parsing() {
        assert_eq!("09:05".parse::<TimeOfDay>().unwrap(), TimeOfDay::new(9, 5).unwrap());
        assert_eq!("7:30".parse::<TimeOfDay>().unwrap().to_string(), "07:30");
        for bad in ["25:00", "12:60", "9:5", "noon", "12", ""] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_time_zone_validation() {
        let descriptor = ScheduleBuilder::new()
            .daily()
            .in_time_zone("America/New_York")
            .unwrap()
            .to_config()
            .unwrap();
        assert_eq!(descriptor.time_zone(), chrono_tz::America::New_York);

        assert_eq!(
            ScheduleBuilder::new().in_time_zone("Mars/Olympus").unwrap_err(),
            ScheduleValidationError::InvalidTimeZone("Mars/Olympus".to_string())
        );
    }

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = ScheduleBuilder::new().to_config().unwrap();
        assert!(descriptor.cron().is_none());
        assert_eq!(descriptor.time().to_string(), "00:00");
        assert_eq!(descriptor.time_zone(), Tz::UTC);
        assert!(!descriptor.excludes_weekends());
        assert!(descriptor.holidays().is_empty());
    }

    #[test]
    fn test_weekend_exclusion_uses_descriptor_zone() {
        let descriptor = ScheduleBuilder::new()
            .daily()
            .in_time_zone("Asia/Tokyo")
            .unwrap()
            .excluding_weekends()
            .to_config()
            .unwrap();

        // Friday 23:30 UTC is Saturday morning in Tokyo.
        let friday_night = Utc.with_ymd_and_hms(2024, 1, 5, 23, 30, 0).unwrap();
        assert_eq!(
            descriptor.is_excluded(friday_night),
            Some(Exclusion::Weekend(Weekday::Sat))
        );

        let friday_noon = Utc.with_ymd_and_hms(2024, 1, 5, 3, 0, 0).unwrap();
        assert_eq!(descriptor.is_excluded(friday_noon), None);
    }

    #[test]
    fn test_holiday_exclusion() {
        let descriptor = ScheduleBuilder::new()
            .daily()
            .excluding_holidays([date(2024, 12, 25), date(2024, 1, 1), date(2024, 12, 25)])
            .to_config()
            .unwrap();
        assert_eq!(descriptor.holidays(), &[date(2024, 1, 1), date(2024, 12, 25)]);

        let christmas = Utc.with_ymd_and_hms(2024, 12, 25, 10, 0, 0).unwrap();
        assert_eq!(
            descriptor.is_excluded(christmas),
            Some(Exclusion::Holiday(date(2024, 12, 25)))
        );
        assert!(descriptor.is_excluded(christmas + chrono::Duration::days(1)).is_none());
    }

    #[test]
    fn test_upcoming_skips_excluded_days() {
        let descriptor = ScheduleBuilder::new()
            .daily()
            .at("09:00")
            .unwrap()
            .excluding_weekends()
            .excluding_holidays([date(2024, 1, 9)])
            .to_config()
            .unwrap();

        let friday = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();
        let runs = descriptor.upcoming(friday, 2);
        assert_eq!(
            runs,
            vec![
                Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_upcoming_without_cron_is_empty() {
        let descriptor = ScheduleBuilder::new().to_config().unwrap();
        assert!(descriptor.upcoming(Utc::now(), 3).is_empty());
    }

    #[test]
    fn test_descriptor_serde() {
        let descriptor = ScheduleBuilder::new()
            .monthly(1)
            .unwrap()
            .at("06:00")
            .unwrap()
            .in_time_zone("Europe/Berlin")
            .unwrap()
            .excluding_weekends()
            .to_config()
            .unwrap();

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["cron"], "0 6 1 * *");
        assert_eq!(json["time"], "06:00");
        assert_eq!(json["timeZone"], "Europe/Berlin");
        assert_eq!(json["excludeWeekends"], true);

        let back: ScheduleDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, descriptor);
    }

    #[test]
    fn test_from_cron_string() {
        let descriptor: ScheduleDescriptor = "*/5 * * * *".parse().unwrap();
        assert_eq!(descriptor.cron().unwrap().as_str(), "*/5 * * * *");
        assert!("invalid-schedule".parse::<ScheduleDescriptor>().is_err());
    }
