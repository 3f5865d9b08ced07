use crate::generate_custom_enum;

generate_custom_enum!(
    /// BACnet property identifiers (BACnetPropertyIdentifier)
    ///
    /// Identifiers 512 and up are vendor proprietary.
    PropertyIdentifier {
        AckedTransitions = 0,
        AckRequired = 1,
        Action = 2,
        ActionText = 3,
        ActiveText = 4,
        AlarmValue = 6,
        All = 8,
        ApduSegmentTimeout = 10,
        ApduTimeout = 11,
        ApplicationSoftwareVersion = 12,
        Archive = 13,
        ChangeOfStateCount = 15,
        ChangeOfStateTime = 16,
        NotificationClass = 17,
        CovIncrement = 22,
        Deadband = 25,
        Description = 28,
        DeviceAddressBinding = 30,
        DeviceType = 31,
        EventEnable = 35,
        EventState = 36,
        EventType = 37,
        FileAccessMethod = 41,
        FileSize = 42,
        FileType = 43,
        FirmwareRevision = 44,
        HighLimit = 45,
        InactiveText = 46,
        LimitEnable = 52,
        LocalDate = 56,
        LocalTime = 57,
        Location = 58,
        LowLimit = 59,
        MaxApduLengthAccepted = 62,
        MaxInfoFrames = 63,
        MaxMaster = 64,
        MaxPresValue = 65,
        MinPresValue = 69,
        ModelName = 70,
        ModificationDate = 71,
        NotifyType = 72,
        NumberOfApduRetries = 73,
        NumberOfStates = 74,
        ObjectIdentifier = 75,
        ObjectList = 76,
        ObjectName = 77,
        ObjectType = 79,
        Optional = 80,
        OutOfService = 81,
        Polarity = 84,
        PresentValue = 85,
        Priority = 86,
        PriorityArray = 87,
        ProtocolObjectTypesSupported = 96,
        ProtocolServicesSupported = 97,
        ProtocolVersion = 98,
        ReadOnly = 99,
        Reliability = 103,
        RelinquishDefault = 104,
        Required = 105,
        Resolution = 106,
        SegmentationSupported = 107,
        StateText = 110,
        StatusFlags = 111,
        SystemStatus = 112,
        TimeDelay = 113,
        Units = 117,
        UpdateInterval = 118,
        UtcOffset = 119,
        VendorIdentifier = 120,
        VendorName = 121,
        RecordCount = 141,
        ProtocolRevision = 139,
        DatabaseRevision = 155,
        PropertyList = 371,
    },
    u32,
    512..=4_194_303
);

impl PropertyIdentifier {
    /// The three identifiers that stand for a group of properties in
    /// ReadPropertyMultiple rather than a single property.
    pub fn is_special(self) -> bool {
        matches!(
            self,
            PropertyIdentifier::All | PropertyIdentifier::Required | PropertyIdentifier::Optional
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_codes() {
        assert_eq!(u32::from(PropertyIdentifier::ObjectList), 76);
        assert_eq!(PropertyIdentifier::from(85u32), PropertyIdentifier::PresentValue);
        assert!(matches!(PropertyIdentifier::from(9600u32), PropertyIdentifier::Custom(_)));
        assert!(PropertyIdentifier::Required.is_special());
        assert!(!PropertyIdentifier::ObjectName.is_special());
    }
}
